//! Per-identity pacing worker

use herald_common::types::{CampaignId, IdentityId};
use herald_storage::models::{
    CampaignStatus, Contact, Group, MessageStatus, NewMessageLog, Platform, Property,
    SendingIdentity,
};
use herald_storage::Store;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pacing::{Cadence, Pacer, Pause};
use super::reconciler::Reconciler;
use super::target::Target;
use crate::channel::{ChannelAdapter, SendOutcome};

/// Final tally of one worker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub identity_id: IdentityId,
    pub targets_processed: usize,
    pub sent: u64,
    pub failed: u64,
    /// Stopped before exhausting its targets
    pub cancelled: bool,
}

/// Walks one identity's share of a campaign, one send at a time
pub struct PacingWorker {
    campaign_id: CampaignId,
    identity: SendingIdentity,
    groups: Vec<Group>,
    contacts: Vec<Contact>,
    properties: Vec<Property>,
    cadence: Cadence,
    store: Store,
    channel: Arc<dyn ChannelAdapter>,
    pacer: Arc<dyn Pacer>,
    reconciler: Reconciler,
    shutdown: CancellationToken,
    rng: StdRng,
}

impl PacingWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaign_id: CampaignId,
        identity: SendingIdentity,
        groups: Vec<Group>,
        contacts: Vec<Contact>,
        properties: Vec<Property>,
        cadence: Cadence,
        store: Store,
        channel: Arc<dyn ChannelAdapter>,
        pacer: Arc<dyn Pacer>,
        shutdown: CancellationToken,
        rng: StdRng,
    ) -> Self {
        Self {
            campaign_id,
            identity,
            groups,
            contacts,
            properties,
            cadence,
            reconciler: Reconciler::new(store.clone()),
            store,
            channel,
            pacer,
            shutdown,
            rng,
        }
    }

    /// Run until every target is processed or the campaign stops running
    pub async fn run(mut self) -> WorkerSummary {
        let queue = self.build_queue();
        let mut properties = std::mem::take(&mut self.properties);
        let mut summary = WorkerSummary {
            identity_id: self.identity.id,
            ..Default::default()
        };
        let mut rest_pending = false;

        info!(
            campaign_id = %self.campaign_id,
            identity = %self.identity.name,
            targets = queue.len(),
            "Pacing worker started"
        );

        for target in &queue {
            if self.should_stop().await {
                summary.cancelled = true;
                break;
            }

            properties.shuffle(&mut self.rng);
            let destination = target.destination();

            for property in &properties {
                if rest_pending {
                    let rest = self.cadence.rest(&mut self.rng);
                    debug!(identity = %self.identity.name, ?rest, "Pulse rest");
                    self.pacer.pause(Pause::PulseRest, rest).await;
                    rest_pending = false;
                }

                let delay = self.cadence.send_delay(&mut self.rng);
                self.pacer.pause(Pause::BeforeSend, delay).await;

                let outcome = self
                    .channel
                    .send(&self.identity, &destination, &property.content)
                    .await;
                self.audit(target, property, &outcome).await;

                if outcome.ok {
                    summary.sent += 1;
                    self.record_sent().await;
                    if self.cadence.rest_due(summary.sent) {
                        rest_pending = true;
                    }
                } else {
                    summary.failed += 1;
                    warn!(
                        campaign_id = %self.campaign_id,
                        identity = %self.identity.name,
                        target = target.kind(),
                        %destination,
                        "Send failed: {}",
                        outcome.detail
                    );
                }
            }
            summary.targets_processed += 1;
        }

        self.reconciler.reconcile_logged(self.campaign_id).await;

        info!(
            campaign_id = %self.campaign_id,
            identity = %self.identity.name,
            processed = summary.targets_processed,
            sent = summary.sent,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Pacing worker finished"
        );
        summary
    }

    /// Groups first, then contacts, each independently shuffled
    fn build_queue(&mut self) -> Vec<Target> {
        let mut groups = std::mem::take(&mut self.groups);
        let mut contacts = std::mem::take(&mut self.contacts);
        groups.shuffle(&mut self.rng);
        contacts.shuffle(&mut self.rng);

        groups
            .into_iter()
            .map(Target::Group)
            .chain(contacts.into_iter().map(Target::Contact))
            .collect()
    }

    async fn should_stop(&self) -> bool {
        if self.shutdown.is_cancelled() {
            info!(campaign_id = %self.campaign_id, "Shutdown requested, stopping worker");
            return true;
        }

        match self.store.campaigns.status(self.campaign_id).await {
            Ok(Some(CampaignStatus::Running)) => false,
            Ok(status) => {
                info!(
                    campaign_id = %self.campaign_id,
                    identity = %self.identity.name,
                    ?status,
                    "Campaign no longer running, stopping worker"
                );
                true
            }
            Err(e) => {
                warn!(campaign_id = %self.campaign_id, "Status check failed: {}", e);
                false
            }
        }
    }

    async fn audit(&self, target: &Target, property: &Property, outcome: &SendOutcome) {
        let (status, error_message) = if outcome.ok {
            (MessageStatus::Sent, None)
        } else {
            (MessageStatus::Failed, Some(outcome.detail.clone()))
        };

        let entry = NewMessageLog {
            campaign_id: self.campaign_id,
            identity_id: Some(self.identity.id),
            contact_id: target.contact_id(),
            group_id: target.group_id(),
            property_id: Some(property.id),
            message_text: property.content.clone(),
            status,
            error_message,
            platform: Platform::Whatsapp,
        };

        if let Err(e) = self.store.message_logs.append(entry).await {
            error!(
                campaign_id = %self.campaign_id,
                target_id = %target.id(),
                "Failed to write message log: {}",
                e
            );
        }
    }

    async fn record_sent(&self) {
        if let Err(e) = self.store.identities.record_sent(self.identity.id).await {
            error!(identity = %self.identity.name, "Failed to update send counters: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::pacing::{PulseWindow, RecordingPacer};
    use crate::dispatch::test_support::{seed_campaign, ScriptedChannel};
    use herald_storage::models::{CampaignSettings, ContactStatus, IdentityStatus};
    use herald_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use std::time::Duration;

    struct Fixture {
        memory: Arc<MemoryStore>,
        store: Store,
        campaign_id: CampaignId,
        identity: SendingIdentity,
        properties: Vec<Property>,
    }

    async fn fixture(property_count: usize) -> Fixture {
        let memory = Arc::new(MemoryStore::new());
        let store = Store::memory(memory.clone());
        let identity = memory.add_identity("Primary", IdentityStatus::Connected).await;
        let (campaign_id, properties) = seed_campaign(&store, property_count).await;
        store
            .campaigns
            .mark_running(campaign_id, chrono::Utc::now(), 0, 0)
            .await
            .unwrap();

        Fixture {
            memory,
            store,
            campaign_id,
            identity,
            properties,
        }
    }

    async fn contacts(memory: &MemoryStore, count: usize) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for i in 0..count {
            contacts.push(
                memory
                    .add_contact(&format!("9198000000{:02}", i), "Lead", &[], ContactStatus::Active)
                    .await,
            );
        }
        contacts
    }

    fn worker(
        fx: &Fixture,
        groups: Vec<Group>,
        contacts: Vec<Contact>,
        settings: CampaignSettings,
        channel: Arc<dyn ChannelAdapter>,
        pacer: Arc<dyn Pacer>,
    ) -> PacingWorker {
        PacingWorker::new(
            fx.campaign_id,
            fx.identity.clone(),
            groups,
            contacts,
            fx.properties.clone(),
            Cadence::new(&settings, PulseWindow::new(2, 5)),
            fx.store.clone(),
            channel,
            pacer,
            CancellationToken::new(),
            StdRng::seed_from_u64(42),
        )
    }

    fn settings(fx: &Fixture, every: i32) -> CampaignSettings {
        CampaignSettings {
            delay_min: 0,
            delay_max: 0,
            pause_every_x_messages: every,
            ..CampaignSettings::defaults_for(fx.campaign_id)
        }
    }

    #[tokio::test]
    async fn test_pulse_rest_follows_every_third_success() {
        let fx = fixture(1).await;
        let contacts = contacts(&fx.memory, 10).await;
        let pacer = Arc::new(RecordingPacer::new());
        let channel = Arc::new(ScriptedChannel::always_ok());

        let summary = worker(&fx, Vec::new(), contacts, settings(&fx, 3), channel, pacer.clone())
            .run()
            .await;
        assert_eq!(summary.sent, 10);

        // positions of rests among the pause stream, counted in sends before them
        let mut sends_before = 0;
        let mut rests_after = Vec::new();
        for (kind, duration) in pacer.pauses() {
            match kind {
                Pause::BeforeSend => sends_before += 1,
                Pause::PulseRest => {
                    assert!((2..=5).contains(&duration.as_secs()));
                    rests_after.push(sends_before);
                }
            }
        }
        assert_eq!(rests_after, vec![3, 6, 9]);
    }

    #[tokio::test]
    async fn test_no_rest_after_last_send() {
        let fx = fixture(1).await;
        let contacts = contacts(&fx.memory, 3).await;
        let pacer = Arc::new(RecordingPacer::new());

        worker(
            &fx,
            Vec::new(),
            contacts,
            settings(&fx, 3),
            Arc::new(ScriptedChannel::always_ok()),
            pacer.clone(),
        )
        .run()
        .await;

        assert!(pacer.pauses().iter().all(|(kind, _)| *kind == Pause::BeforeSend));
        assert_eq!(pacer.pauses().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_are_audited_and_do_not_count_toward_pulse() {
        let fx = fixture(2).await;
        let contacts = contacts(&fx.memory, 2).await;
        let pacer = Arc::new(RecordingPacer::new());
        // ok, fail, ok, fail
        let channel = Arc::new(ScriptedChannel::alternating());

        let summary = worker(&fx, Vec::new(), contacts, settings(&fx, 3), channel, pacer.clone())
            .run()
            .await;

        assert_eq!((summary.sent, summary.failed), (2, 2));
        let logs = fx.memory.message_log_entries().await;
        assert_eq!(logs.len(), 4);
        let failed: Vec<_> = logs.iter().filter(|l| l.status == "FAILED").collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|l| l.error_message.as_deref() == Some("gateway down")));
        assert!(logs.iter().all(|l| l.status != "SENT" || l.error_message.is_none()));
        assert!(pacer.pauses().iter().all(|(kind, _)| *kind == Pause::BeforeSend));

        let identity = fx.store.identities.get(fx.identity.id).await.unwrap().unwrap();
        assert_eq!(identity.total_sent, 2);
        assert_eq!(identity.sent_today, 2);
    }

    #[tokio::test]
    async fn test_groups_are_sent_before_contacts() {
        let fx = fixture(1).await;
        let contacts = contacts(&fx.memory, 3).await;
        let mut groups = Vec::new();
        for jid in ["1@g.us", "2@g.us"] {
            groups.push(fx.memory.add_group(fx.identity.id, jid, "Group").await);
        }
        let channel = Arc::new(ScriptedChannel::always_ok());

        worker(
            &fx,
            groups,
            contacts,
            settings(&fx, 100),
            channel.clone(),
            Arc::new(RecordingPacer::new()),
        )
        .run()
        .await;

        let destinations = channel.destinations();
        assert_eq!(destinations.len(), 5);
        assert!(destinations[..2].iter().all(|d| d.ends_with("@g.us")));
        assert!(destinations[2..].iter().all(|d| d.ends_with("@c.us")));

        let logs = fx.memory.message_log_entries().await;
        assert!(logs[..2].iter().all(|l| l.group_id.is_some() && l.contact_id.is_none()));
    }

    #[tokio::test]
    async fn test_every_property_reaches_every_target() {
        let fx = fixture(3).await;
        let contacts = contacts(&fx.memory, 4).await;
        let channel = Arc::new(ScriptedChannel::always_ok());

        worker(
            &fx,
            Vec::new(),
            contacts.clone(),
            settings(&fx, 100),
            channel,
            Arc::new(RecordingPacer::new()),
        )
        .run()
        .await;

        let logs = fx.memory.message_log_entries().await;
        for contact in &contacts {
            let mut seen: Vec<_> = logs
                .iter()
                .filter(|l| l.contact_id == Some(contact.id))
                .filter_map(|l| l.property_id)
                .collect();
            seen.sort();
            let mut expected: Vec<_> = fx.properties.iter().map(|p| p.id).collect();
            expected.sort();
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test]
    async fn test_pause_stops_after_current_target() {
        let fx = fixture(2).await;
        let contacts = contacts(&fx.memory, 3).await;
        // pauses the campaign during the second send, i.e. inside the first target
        let channel = Arc::new(ScriptedChannel::pausing(fx.store.clone(), fx.campaign_id, 2));

        let summary = worker(
            &fx,
            Vec::new(),
            contacts,
            settings(&fx, 100),
            channel,
            Arc::new(RecordingPacer::new()),
        )
        .run()
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.targets_processed, 1);
        assert_eq!(fx.memory.message_log_entries().await.len(), 2);
        let campaign = fx.store.campaigns.get(fx.campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.status, "PAUSED");
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_worker() {
        let fx = fixture(1).await;
        let contacts = contacts(&fx.memory, 3).await;
        let token = CancellationToken::new();
        token.cancel();

        let summary = PacingWorker::new(
            fx.campaign_id,
            fx.identity.clone(),
            Vec::new(),
            contacts,
            fx.properties.clone(),
            Cadence::new(&settings(&fx, 100), PulseWindow::new(2, 5)),
            fx.store.clone(),
            Arc::new(ScriptedChannel::always_ok()),
            Arc::new(RecordingPacer::new()),
            token,
            StdRng::seed_from_u64(1),
        )
        .run()
        .await;

        assert!(summary.cancelled);
        assert!(fx.memory.message_log_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_delay_precedes_every_send() {
        let fx = fixture(1).await;
        let contacts = contacts(&fx.memory, 2).await;
        let pacer = Arc::new(RecordingPacer::new());
        let campaign_settings = CampaignSettings {
            delay_min: 8,
            delay_max: 12,
            ..settings(&fx, 100)
        };

        worker(
            &fx,
            Vec::new(),
            contacts,
            campaign_settings,
            Arc::new(ScriptedChannel::always_ok()),
            pacer.clone(),
        )
        .run()
        .await;

        let pauses = pacer.pauses();
        assert_eq!(pauses.len(), 2);
        assert!(pauses
            .iter()
            .all(|(_, d)| *d >= Duration::from_secs(8) && *d <= Duration::from_secs(12)));
    }
}
