//! Campaign Manager - campaign lifecycle and trigger surface

use chrono::Utc;
use herald_common::types::{CampaignId, GroupId};
use herald_storage::models::{
    Campaign, CampaignSettingsInput, CampaignStats, CampaignStatus, CreateCampaign,
    CreateProperty, MessageLog, MessageLogFilter, Platform, SendingIdentity,
};
use herald_storage::Store;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::{DispatchError, DispatchResult};

/// Default page size for listings
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
/// Largest page a listing may request
pub const MAX_PAGE_LIMIT: i64 = 500;

/// One-off broadcast request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickBroadcast {
    pub message: String,
    #[serde(default = "default_true")]
    pub send_whatsapp: bool,
    #[serde(default)]
    pub send_facebook: bool,
    #[serde(default)]
    pub send_instagram: bool,
    #[serde(default)]
    pub send_to_all_contacts: bool,
    #[serde(default)]
    pub target_tags: Vec<String>,
    #[serde(default)]
    pub send_to_all_groups: bool,
    #[serde(default)]
    pub target_groups: Vec<GroupId>,
}

fn default_true() -> bool {
    true
}

impl QuickBroadcast {
    fn validate(&self) -> DispatchResult<()> {
        if self.message.trim().is_empty() {
            return Err(DispatchError::Validation(
                "message must not be empty".to_string(),
            ));
        }
        if !self.send_whatsapp && !self.send_facebook && !self.send_instagram {
            return Err(DispatchError::Validation(
                "select at least one channel".to_string(),
            ));
        }
        let has_target = self.send_to_all_contacts
            || !self.target_tags.is_empty()
            || self.send_to_all_groups
            || !self.target_groups.is_empty();
        if self.send_whatsapp && !has_target {
            return Err(DispatchError::Validation(
                "select contacts or groups for a WhatsApp broadcast".to_string(),
            ));
        }
        Ok(())
    }
}

/// Campaign Manager - validates requests and drives the dispatcher
#[derive(Clone)]
pub struct CampaignManager {
    dispatcher: Dispatcher,
}

impl CampaignManager {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn store(&self) -> &Store {
        self.dispatcher.store()
    }

    /// Create a campaign in DRAFT
    pub async fn create_campaign(&self, input: CreateCampaign) -> DispatchResult<Campaign> {
        if input.name.trim().is_empty() {
            return Err(DispatchError::Validation("name must not be empty".to_string()));
        }
        input.settings.validate().map_err(DispatchError::Validation)?;

        let campaign = self.store().campaigns.create(input).await?;
        info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: CampaignId) -> DispatchResult<Campaign> {
        self.store()
            .campaigns
            .get(id)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    pub async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> DispatchResult<Vec<Campaign>> {
        Ok(self
            .store()
            .campaigns
            .list(status, limit.clamp(1, MAX_PAGE_LIMIT), offset.max(0))
            .await?)
    }

    /// Start dispatching; rejected while the campaign is RUNNING
    pub async fn start_campaign(&self, id: CampaignId) -> DispatchResult<Dispatch> {
        let campaign = self.get_campaign(id).await?;
        if campaign.is_running() {
            return Err(DispatchError::AlreadyRunning);
        }
        self.dispatcher.start(id).await
    }

    /// Mark the campaign PAUSED; workers stop before their next target
    pub async fn pause_campaign(&self, id: CampaignId) -> DispatchResult<Campaign> {
        let campaign = self
            .store()
            .campaigns
            .update_status(id, CampaignStatus::Paused)
            .await?
            .ok_or(DispatchError::NotFound)?;

        info!(campaign_id = %id, "Campaign paused");
        Ok(campaign)
    }

    /// Create a throwaway property and campaign for `request` and start it
    pub async fn quick_broadcast(
        &self,
        request: QuickBroadcast,
    ) -> DispatchResult<(Campaign, Dispatch)> {
        request.validate()?;

        let now = Utc::now();
        let property = self
            .store()
            .properties
            .create(CreateProperty {
                title: format!("Broadcast {}", now.format("%Y-%m-%d %H:%M")),
                content: request.message.clone(),
            })
            .await?;

        let campaign = self
            .create_campaign(CreateCampaign {
                name: format!("Quick Broadcast {}", now.format("%Y-%m-%d %H:%M:%S")),
                property_ids: vec![property.id],
                send_to_all_contacts: request.send_to_all_contacts,
                target_tags: request.target_tags,
                send_to_all_groups: request.send_to_all_groups,
                target_group_ids: request.target_groups,
                send_to_whatsapp: request.send_whatsapp,
                post_to_facebook: request.send_facebook,
                post_to_instagram: request.send_instagram,
                settings: CampaignSettingsInput::default(),
            })
            .await?;

        let dispatch = self.dispatcher.start(campaign.id).await?;
        let campaign = self.get_campaign(campaign.id).await?;
        Ok((campaign, dispatch))
    }

    /// Progress of the current run, derived from the WhatsApp audit trail
    pub async fn campaign_stats(&self, id: CampaignId) -> DispatchResult<CampaignStats> {
        let campaign = self.get_campaign(id).await?;
        let property_count = self.store().campaigns.properties(id).await?.len() as i64;
        let counts = self
            .store()
            .message_logs
            .status_counts(id, Platform::Whatsapp, campaign.started_at)
            .await?;

        let expected = campaign.total_targets() * property_count;
        let processed = counts.processed();
        let progress_percentage = if expected > 0 {
            let ratio = (processed as f64 / expected as f64).min(1.0);
            (ratio * 10_000.0).round() / 100.0
        } else if campaign.status_enum() == Some(CampaignStatus::Completed) {
            100.0
        } else {
            0.0
        };

        Ok(CampaignStats {
            campaign_id: id,
            status: campaign.status,
            total_contacts: campaign.total_contacts,
            total_groups: campaign.total_groups,
            property_count,
            expected,
            processed,
            sent: counts.succeeded(),
            failed: counts.failed,
            progress_percentage,
            started_at: campaign.started_at,
            completed_at: campaign.completed_at,
        })
    }

    /// Audit entries, newest first
    pub async fn list_logs(&self, mut filter: MessageLogFilter) -> DispatchResult<Vec<MessageLog>> {
        filter.limit = if filter.limit <= 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            filter.limit.min(MAX_PAGE_LIMIT)
        };
        filter.offset = filter.offset.max(0);
        Ok(self.store().message_logs.list(filter).await?)
    }

    pub async fn list_identities(&self) -> DispatchResult<Vec<SendingIdentity>> {
        Ok(self.store().identities.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::test_support::{seed_campaign_with, CampaignShape, ScriptedChannel};
    use crate::dispatch::RecordingPacer;
    use herald_storage::models::{ContactStatus, IdentityStatus, MessageStatus};
    use herald_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn manager(memory: &Arc<MemoryStore>) -> CampaignManager {
        let dispatcher = Dispatcher::new(
            Store::memory(memory.clone()),
            Arc::new(ScriptedChannel::always_ok()),
        )
        .with_pacer(Arc::new(RecordingPacer::new()))
        .with_seed(5);
        CampaignManager::new(dispatcher)
    }

    fn broadcast(message: &str) -> QuickBroadcast {
        QuickBroadcast {
            message: message.to_string(),
            send_whatsapp: true,
            send_facebook: false,
            send_instagram: false,
            send_to_all_contacts: true,
            target_tags: Vec::new(),
            send_to_all_groups: false,
            target_groups: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_delays() {
        let memory = Arc::new(MemoryStore::new());
        let result = manager(&memory)
            .create_campaign(CreateCampaign {
                name: "Bad".to_string(),
                property_ids: Vec::new(),
                send_to_all_contacts: true,
                target_tags: Vec::new(),
                send_to_all_groups: false,
                target_group_ids: Vec::new(),
                send_to_whatsapp: true,
                post_to_facebook: false,
                post_to_instagram: false,
                settings: CampaignSettingsInput {
                    delay_min: 20,
                    delay_max: 10,
                    ..Default::default()
                },
            })
            .await;

        assert!(matches!(result, Err(DispatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_start_rejects_running_campaign() {
        let memory = Arc::new(MemoryStore::new());
        let manager = manager(&memory);
        let id = seed_campaign_with(manager.store(), CampaignShape::default()).await;
        manager
            .store()
            .campaigns
            .mark_running(id, Utc::now(), 0, 0)
            .await
            .unwrap();

        let result = manager.start_campaign(id).await;
        assert!(matches!(result, Err(DispatchError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn test_start_unknown_campaign() {
        let memory = Arc::new(MemoryStore::new());
        let result = manager(&memory).start_campaign(uuid::Uuid::new_v4()).await;
        assert!(matches!(result, Err(DispatchError::NotFound)));
    }

    #[tokio::test]
    async fn test_pause_sets_status() {
        let memory = Arc::new(MemoryStore::new());
        let manager = manager(&memory);
        let id = seed_campaign_with(manager.store(), CampaignShape::default()).await;

        let paused = manager.pause_campaign(id).await.unwrap();
        assert_eq!(paused.status, "PAUSED");
        assert!(matches!(
            manager.pause_campaign(uuid::Uuid::new_v4()).await,
            Err(DispatchError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_quick_broadcast_validation() {
        let memory = Arc::new(MemoryStore::new());
        let manager = manager(&memory);

        let empty = manager.quick_broadcast(broadcast("   ")).await;
        assert!(matches!(empty, Err(DispatchError::Validation(_))));

        let no_target = QuickBroadcast {
            send_to_all_contacts: false,
            ..broadcast("Open house on Sunday")
        };
        assert!(matches!(
            manager.quick_broadcast(no_target).await,
            Err(DispatchError::Validation(_))
        ));

        let no_channel = QuickBroadcast {
            send_whatsapp: false,
            ..broadcast("Open house on Sunday")
        };
        assert!(matches!(
            manager.quick_broadcast(no_channel).await,
            Err(DispatchError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_quick_broadcast_sends_message_to_contacts() {
        let memory = Arc::new(MemoryStore::new());
        memory.add_identity("Primary", IdentityStatus::Connected).await;
        memory
            .add_contact("919800000001", "Asha", &[], ContactStatus::Active)
            .await;
        memory
            .add_contact("919800000002", "Ravi", &[], ContactStatus::Active)
            .await;
        let manager = manager(&memory);

        let (campaign, dispatch) = manager
            .quick_broadcast(broadcast("Open house on Sunday"))
            .await
            .unwrap();
        assert_eq!(campaign.total_contacts, 2);
        dispatch.wait().await;

        let logs = memory.message_log_entries().await;
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.message_text == "Open house on Sunday"));

        let stats = manager.campaign_stats(campaign.id).await.unwrap();
        assert_eq!(stats.status, "COMPLETED");
        assert_eq!(stats.expected, 2);
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.progress_percentage, 100.0);
    }

    #[tokio::test]
    async fn test_stats_report_partial_progress() {
        let memory = Arc::new(MemoryStore::new());
        let manager = manager(&memory);
        let id = seed_campaign_with(
            manager.store(),
            CampaignShape {
                properties: 2,
                ..Default::default()
            },
        )
        .await;
        manager
            .store()
            .campaigns
            .mark_running(id, Utc::now(), 3, 0)
            .await
            .unwrap();

        for status in [MessageStatus::Sent, MessageStatus::Failed] {
            manager
                .store()
                .message_logs
                .append(herald_storage::models::NewMessageLog {
                    campaign_id: id,
                    identity_id: None,
                    contact_id: None,
                    group_id: None,
                    property_id: None,
                    message_text: "x".to_string(),
                    status,
                    error_message: None,
                    platform: Platform::Whatsapp,
                })
                .await
                .unwrap();
        }

        let stats = manager.campaign_stats(id).await.unwrap();
        assert_eq!(stats.expected, 6);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.progress_percentage, 33.33);
    }

    #[tokio::test]
    async fn test_list_logs_clamps_limit() {
        let memory = Arc::new(MemoryStore::new());
        let logs = manager(&memory)
            .list_logs(MessageLogFilter {
                limit: 10_000,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(logs.is_empty());
    }
}
