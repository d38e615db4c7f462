//! Background maintenance jobs

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use herald_common::Result;
use herald_storage::models::CampaignStatus;
use herald_storage::Store;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::dispatch::Reconciler;

const SWEEP_PAGE_SIZE: i64 = 100;

/// Time left until the next UTC midnight
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let tomorrow = now.date_naive() + ChronoDuration::days(1);
    let midnight = tomorrow.and_hms_opt(0, 0, 0).map(|t| t.and_utc());

    match midnight {
        Some(midnight) => (midnight - now).to_std().unwrap_or(Duration::ZERO),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

/// Daily counter reset and periodic completion sweep
#[derive(Clone)]
pub struct Maintenance {
    store: Store,
    reconciler: Reconciler,
    reconcile_interval: Duration,
    shutdown: CancellationToken,
}

impl Maintenance {
    pub fn new(store: Store, reconcile_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            store,
            reconcile_interval,
            shutdown,
        }
    }

    /// Zero every identity's `sent_today`
    pub async fn reset_daily_counters(&self) -> Result<u64> {
        let reset = self.store.identities.reset_sent_today().await?;
        info!(identities = reset, "Daily send counters reset");
        Ok(reset)
    }

    /// Reconcile every RUNNING campaign. Returns how many were completed.
    pub async fn sweep_running(&self) -> Result<usize> {
        let mut running = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .store
                .campaigns
                .list(Some(CampaignStatus::Running), SWEEP_PAGE_SIZE, offset)
                .await?;
            let len = page.len() as i64;
            running.extend(page.into_iter().map(|c| c.id));
            if len < SWEEP_PAGE_SIZE {
                break;
            }
            offset += len;
        }

        let mut completed = 0;
        for campaign_id in running {
            match self.reconciler.reconcile(campaign_id).await {
                Ok(true) => completed += 1,
                Ok(false) => {}
                Err(e) => error!(campaign_id = %campaign_id, "Sweep reconciliation failed: {}", e),
            }
        }
        debug!(completed, "Reconciliation sweep finished");
        Ok(completed)
    }

    /// Reset counters at every UTC midnight until shutdown
    pub async fn run_daily_reset(self) {
        info!("Daily counter reset scheduled");
        loop {
            let wait = until_next_midnight(Utc::now());
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.reset_daily_counters().await {
                error!("Failed to reset daily counters: {}", e);
            }
        }
        info!("Daily counter reset stopped");
    }

    /// Sweep RUNNING campaigns on a fixed interval until shutdown
    pub async fn run_reconcile_sweep(self) {
        let mut ticker = interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Reconciliation sweep started (interval: {}s)",
            self.reconcile_interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.sweep_running().await {
                error!("Reconciliation sweep failed: {}", e);
            }
        }
        info!("Reconciliation sweep stopped");
    }
}
