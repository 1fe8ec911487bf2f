//! Sync Worker
//!
//! Background loop that periodically re-evaluates active transfers against
//! the node and prunes old settled records.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::error::TransferError;
use super::tracker::TransferTracker;

/// Configuration for the sync worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to re-sync transfer states
    pub sync_interval: Duration,
    /// How long settled transfers are kept before pruning
    pub settled_retention: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            settled_retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Outcome of one worker cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub settled: usize,
    pub pruned: usize,
}

pub struct SyncWorker {
    tracker: Arc<TransferTracker>,
    config: WorkerConfig,
}

impl SyncWorker {
    pub fn new(tracker: Arc<TransferTracker>, config: WorkerConfig) -> Self {
        Self { tracker, config }
    }

    pub fn with_defaults(tracker: Arc<TransferTracker>) -> Self {
        Self::new(tracker, WorkerConfig::default())
    }

    /// Run the sync loop forever
    pub async fn run(&self) -> ! {
        info!(
            sync_interval_ms = self.config.sync_interval.as_millis() as u64,
            settled_retention_secs = self.config.settled_retention.as_secs(),
            "Starting transfer sync worker"
        );

        loop {
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Transfer sync cycle failed");
            }

            tokio::time::sleep(self.config.sync_interval).await;
        }
    }

    /// Run a single sync + prune cycle
    pub async fn run_once(&self) -> Result<SyncReport, TransferError> {
        let settled = self.tracker.sync_transfer_states().await?;
        let pruned = self
            .tracker
            .prune_settled(self.config.settled_retention)
            .await?;

        if settled > 0 || pruned > 0 {
            info!(settled, pruned, "Transfer sync cycle");
        } else {
            debug!("Transfer sync cycle: nothing to do");
        }

        Ok(SyncReport { settled, pruned })
    }
}
