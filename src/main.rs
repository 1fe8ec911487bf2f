//! Wallet Balance - reconcile a node snapshot
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌───────────┐    ┌──────────────┐
//! │ Snapshot │───▶│ TransferSync │───▶│ Reconcile │───▶│ BalanceState │
//! │  (JSON)  │    │ (settle/prune)│   │  (engine) │    │   (stdout)   │
//! └──────────┘    └──────────────┘    └───────────┘    └──────────────┘
//! ```
//!
//! Usage: `wallet_balance [--env dev] [--snapshot fixtures/snapshot.json]`

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use wallet_balance::balance::{BalanceError, BalanceManager};
use wallet_balance::config::AppConfig;
use wallet_balance::node::SnapshotNode;
use wallet_balance::transfer::{MemoryTransferRepo, SyncWorker, TransferService, TransferTracker};

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_snapshot_path() -> String {
    get_arg(&["--snapshot", "-s"]).unwrap_or_else(|| "fixtures/snapshot.json".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).with_context(|| format!("loading config/{}.yaml", env))?;
    let _log_guard = wallet_balance::logging::init_logging(&app_config);

    info!("Starting wallet balance reconciliation in {} mode", env);

    let snapshot_path = get_snapshot_path();
    let node = Arc::new(
        SnapshotNode::from_file(&snapshot_path)
            .with_context(|| format!("loading snapshot {}", snapshot_path))?,
    );

    let repo = Arc::new(MemoryTransferRepo::with_transfers(node.seed_transfers().await));
    let service = Arc::new(TransferService::new(
        repo,
        node.clone(),
        node.clone(),
        node.clone(),
    ));
    let tracker = Arc::new(TransferTracker::new(service.clone()));
    tracker.load_active_transfers().await?;

    let worker = SyncWorker::new(tracker.clone(), app_config.transfers.worker_config());
    let report = worker.run_once().await?;
    info!(
        settled = report.settled,
        pruned = report.pruned,
        active = tracker.active_transfers().len(),
        "Transfers synced"
    );

    let manager = BalanceManager::new(node.clone(), node.clone(), node, service);
    let output = match manager.derive_balance_state().await {
        Ok(state) => serde_json::json!({
            "status": "known",
            "total_balance_sats": state.total_balance_sats(),
            "balance": state,
            "active_transfers": tracker.active_transfers().len(),
        }),
        Err(BalanceError::BalanceUnavailable) => serde_json::json!({
            "status": "unknown",
            "reason": BalanceError::BalanceUnavailable.to_string(),
        }),
        Err(e) => return Err(e.into()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
