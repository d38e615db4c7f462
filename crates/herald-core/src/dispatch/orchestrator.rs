//! Campaign dispatch orchestration

use chrono::Utc;
use herald_common::types::CampaignId;
use herald_storage::models::{
    Campaign, CampaignSettings, CampaignStatus, Contact, Group, IdentityStatus, MessageStatus,
    NewMessageLog, Platform, Property, SendingIdentity,
};
use herald_storage::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pacing::{Cadence, Pacer, PulseWindow, TokioPacer};
use super::partition::{partition_by_owner, partition_round_robin};
use super::worker::{PacingWorker, WorkerSummary};
use crate::channel::{ChannelAdapter, SendOutcome, SideChannelPoster};
use crate::error::{DispatchError, DispatchResult};

/// Handle to a started dispatch round
///
/// Dropping it leaves the spawned workers running.
#[derive(Debug)]
pub struct Dispatch {
    pub campaign_id: CampaignId,
    pub total_contacts: i32,
    pub total_groups: i32,
    /// Identities that received a worker
    pub workers_launched: usize,
    /// Completed without launching any worker
    pub completed_immediately: bool,
    workers: Vec<JoinHandle<WorkerSummary>>,
    side_channel: Option<JoinHandle<()>>,
}

impl Dispatch {
    /// Wait for every worker and the side-channel task to finish
    pub async fn wait(self) -> Vec<WorkerSummary> {
        let mut summaries = Vec::with_capacity(self.workers.len());
        for handle in self.workers {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!(campaign_id = %self.campaign_id, "Pacing worker panicked: {}", e),
            }
        }
        if let Some(handle) = self.side_channel {
            if let Err(e) = handle.await {
                error!(campaign_id = %self.campaign_id, "Side-channel task panicked: {}", e);
            }
        }
        summaries
    }
}

/// Partitions a campaign across connected identities and launches workers
#[derive(Clone)]
pub struct Dispatcher {
    store: Store,
    channel: Arc<dyn ChannelAdapter>,
    side_channels: Vec<Arc<dyn SideChannelPoster>>,
    pacer: Arc<dyn Pacer>,
    pulse_window: PulseWindow,
    shutdown: CancellationToken,
    seed: Option<u64>,
}

impl Dispatcher {
    pub fn new(store: Store, channel: Arc<dyn ChannelAdapter>) -> Self {
        Self {
            store,
            channel,
            side_channels: Vec::new(),
            pacer: Arc::new(TokioPacer),
            pulse_window: PulseWindow::default(),
            shutdown: CancellationToken::new(),
            seed: None,
        }
    }

    /// Register a social side-channel poster
    pub fn with_side_channel(mut self, poster: Arc<dyn SideChannelPoster>) -> Self {
        self.side_channels.push(poster);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_pulse_window(mut self, window: PulseWindow) -> Self {
        self.pulse_window = window;
        self
    }

    /// Token observed by every worker before each target
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Seed worker shuffles and jitter for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Start dispatching a campaign
    ///
    /// Targets are resolved before the run is claimed, so the RUNNING
    /// transition and the run's totals land in a single write. Losing the
    /// claim to a concurrent start yields `AlreadyRunning`.
    pub async fn start(&self, campaign_id: CampaignId) -> DispatchResult<Dispatch> {
        let campaign = self
            .store
            .campaigns
            .get(campaign_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        let identities = self
            .store
            .identities
            .list_by_status(IdentityStatus::Connected)
            .await?;
        if identities.is_empty() {
            self.fail(campaign_id, "no connected identities").await;
            return Err(DispatchError::NoEligibleIdentities);
        }

        let properties = self.store.campaigns.properties(campaign_id).await?;
        if properties.is_empty() {
            self.fail(campaign_id, "no linked properties").await;
            return Err(DispatchError::NoPayload);
        }

        let settings = self
            .store
            .campaigns
            .settings(campaign_id)
            .await?
            .unwrap_or_else(|| CampaignSettings::defaults_for(campaign_id));

        let contacts = self.resolve_contacts(&campaign).await?;
        let (group_buckets, dropped) = self.resolve_groups(&campaign, &identities).await?;
        if dropped > 0 {
            debug!(campaign_id = %campaign_id, dropped, "Dropped groups without an eligible owner");
        }

        let total_contacts = contacts.len() as i32;
        let total_groups = group_buckets.iter().map(Vec::len).sum::<usize>() as i32;

        let claimed = self
            .store
            .campaigns
            .mark_running(campaign_id, Utc::now(), total_contacts, total_groups)
            .await?;
        if !claimed {
            return Err(DispatchError::AlreadyRunning);
        }
        info!(
            campaign_id = %campaign_id,
            name = %campaign.name,
            identities = identities.len(),
            properties = properties.len(),
            "Campaign started"
        );

        let side_channel = self.spawn_side_channel_posts(&campaign, &properties);
        let contact_buckets = partition_round_robin(contacts, identities.len());

        if total_contacts + total_groups == 0 {
            self.store
                .campaigns
                .complete_if_running(campaign_id, Utc::now())
                .await?;
            info!(campaign_id = %campaign_id, "Campaign has no targets, completed immediately");
            return Ok(Dispatch {
                campaign_id,
                total_contacts,
                total_groups,
                workers_launched: 0,
                completed_immediately: true,
                workers: Vec::new(),
                side_channel,
            });
        }

        let cadence = Cadence::new(&settings, self.pulse_window);
        let workers = self.launch_workers(
            campaign_id,
            identities,
            group_buckets,
            contact_buckets,
            properties,
            cadence,
        );

        info!(
            campaign_id = %campaign_id,
            total_contacts,
            total_groups,
            workers = workers.len(),
            "Dispatch launched"
        );

        Ok(Dispatch {
            campaign_id,
            total_contacts,
            total_groups,
            workers_launched: workers.len(),
            completed_immediately: false,
            workers,
            side_channel,
        })
    }

    /// Best-effort FAILED marker; the caller still reports the precondition
    async fn fail(&self, campaign_id: CampaignId, reason: &str) {
        warn!(campaign_id = %campaign_id, "Campaign failed to start: {}", reason);
        if let Err(e) = self
            .store
            .campaigns
            .update_status(campaign_id, CampaignStatus::Failed)
            .await
        {
            error!(campaign_id = %campaign_id, "Failed to mark campaign FAILED: {}", e);
        }
    }

    async fn resolve_contacts(&self, campaign: &Campaign) -> DispatchResult<Vec<Contact>> {
        if !campaign.send_to_whatsapp {
            return Ok(Vec::new());
        }
        let contacts = if campaign.send_to_all_contacts {
            self.store.contacts.list_active().await?
        } else {
            self.store
                .contacts
                .list_active_with_any_tag(&campaign.target_tags)
                .await?
        };
        Ok(contacts)
    }

    /// Groups bucketed per identity, plus the number of dropped groups
    async fn resolve_groups(
        &self,
        campaign: &Campaign,
        identities: &[SendingIdentity],
    ) -> DispatchResult<(Vec<Vec<Group>>, usize)> {
        if !campaign.send_to_whatsapp {
            return Ok((identities.iter().map(|_| Vec::new()).collect(), 0));
        }

        if campaign.send_to_all_groups {
            let mut buckets = Vec::with_capacity(identities.len());
            for identity in identities {
                buckets.push(self.store.groups.list_by_identity(identity.id).await?);
            }
            return Ok((buckets, 0));
        }

        let selected = self.store.campaigns.target_groups(campaign.id).await?;
        let owners: Vec<_> = identities.iter().map(|i| i.id).collect();
        Ok(partition_by_owner(selected, &owners))
    }

    fn spawn_side_channel_posts(
        &self,
        campaign: &Campaign,
        properties: &[Property],
    ) -> Option<JoinHandle<()>> {
        let mut platforms = Vec::new();
        if campaign.post_to_facebook {
            platforms.push(Platform::Facebook);
        }
        if campaign.post_to_instagram {
            platforms.push(Platform::Instagram);
        }
        if platforms.is_empty() {
            return None;
        }

        let store = self.store.clone();
        let posters = self.side_channels.clone();
        let properties = properties.to_vec();
        let campaign_id = campaign.id;

        Some(tokio::spawn(async move {
            for platform in platforms {
                let poster = posters.iter().find(|p| p.platform() == platform);
                for property in &properties {
                    let outcome = match poster {
                        Some(poster) => poster.post_text(&property.content).await,
                        None => SendOutcome::failure(format!("No {} poster configured", platform)),
                    };
                    if !outcome.ok {
                        warn!(campaign_id = %campaign_id, %platform, "Side-channel post failed: {}", outcome.detail);
                    }

                    let (status, error_message) = if outcome.ok {
                        (MessageStatus::Sent, None)
                    } else {
                        (MessageStatus::Failed, Some(outcome.detail))
                    };
                    let entry = NewMessageLog {
                        campaign_id,
                        identity_id: None,
                        contact_id: None,
                        group_id: None,
                        property_id: Some(property.id),
                        message_text: property.content.clone(),
                        status,
                        error_message,
                        platform,
                    };
                    if let Err(e) = store.message_logs.append(entry).await {
                        error!(campaign_id = %campaign_id, %platform, "Failed to write message log: {}", e);
                    }
                }
            }
        }))
    }

    fn launch_workers(
        &self,
        campaign_id: CampaignId,
        identities: Vec<SendingIdentity>,
        group_buckets: Vec<Vec<Group>>,
        contact_buckets: Vec<Vec<Contact>>,
        properties: Vec<Property>,
        cadence: Cadence,
    ) -> Vec<JoinHandle<WorkerSummary>> {
        let mut handles = Vec::new();

        for (index, ((identity, groups), contacts)) in identities
            .into_iter()
            .zip(group_buckets)
            .zip(contact_buckets)
            .enumerate()
        {
            if groups.is_empty() && contacts.is_empty() {
                debug!(identity = %identity.name, "No assignment, worker not launched");
                continue;
            }

            let rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => StdRng::seed_from_u64(rand::random()),
            };

            let worker = PacingWorker::new(
                campaign_id,
                identity,
                groups,
                contacts,
                properties.clone(),
                cadence.clone(),
                self.store.clone(),
                self.channel.clone(),
                self.pacer.clone(),
                self.shutdown.clone(),
                rng,
            );
            handles.push(tokio::spawn(worker.run()));
        }
        handles
    }
}
