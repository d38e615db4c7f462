//! Completion reconciliation

use chrono::Utc;
use herald_common::types::CampaignId;
use herald_common::Result;
use herald_storage::models::Platform;
use herald_storage::Store;
use tracing::{debug, info, warn};

/// Level-triggered completion check driven by the audit log
///
/// Safe to call redundantly and concurrently: the final transition is a
/// compare-and-set on RUNNING, so only one caller ever completes a run.
#[derive(Clone)]
pub struct Reconciler {
    store: Store,
}

impl Reconciler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Complete the campaign if every expected send of the current run has
    /// been attempted. Entries from earlier runs are not counted.
    /// Returns true only for the call that performed the transition.
    pub async fn reconcile(&self, campaign_id: CampaignId) -> Result<bool> {
        let campaign = match self.store.campaigns.get(campaign_id).await? {
            Some(campaign) if campaign.is_running() => campaign,
            _ => return Ok(false),
        };

        let property_count = self.store.campaigns.properties(campaign_id).await?.len() as i64;
        let expected = campaign.total_targets() * property_count;
        let actual = self
            .store
            .message_logs
            .count_for_campaign(campaign_id, Platform::Whatsapp, campaign.started_at)
            .await?;

        if actual < expected {
            debug!(
                campaign_id = %campaign_id,
                actual, expected, "Campaign still in progress"
            );
            return Ok(false);
        }

        let completed = self
            .store
            .campaigns
            .complete_if_running(campaign_id, Utc::now())
            .await?;
        if completed {
            info!(
                campaign_id = %campaign_id,
                actual, expected, "Campaign completed"
            );
        }
        Ok(completed)
    }

    /// Reconcile, logging instead of returning errors
    pub async fn reconcile_logged(&self, campaign_id: CampaignId) {
        if let Err(e) = self.reconcile(campaign_id).await {
            warn!(campaign_id = %campaign_id, "Reconciliation failed: {}", e);
        }
    }
}
