//! The stable protocol indexer process.
//!
//! One long-running process: load configuration, connect the node provider
//! and the document store, bootstrap the contract registry, then drive the
//! scan tasks on their configured intervals until interrupted.

use anyhow::{anyhow, Result};
use clap::Parser;
use stablescan_indexer::{
    collections::OPERATIONS,
    config::{
        TASK_SCAN_LOGS, TASK_SCAN_RAW_TRANSACTIONS, TASK_SCAN_RAW_TRANSACTIONS_CONFIRMING,
        TASK_SCAN_TX_STATUS,
    },
    prelude::*,
};
use stablescan_providers_alloy::AlloyNodeProvider;
use stablescan_store_mongo::MongoStore;
use std::sync::Arc;
use tracing::{error, info};

mod cli;
mod telemetry;

const LOG_TARGET: &str = "indexer";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    telemetry::init(cli.v)?;
    let config = cli.load_config()?;

    info!(
        target: LOG_TARGET,
        "Starting stable protocol indexer v{}", env!("CARGO_PKG_VERSION")
    );

    let node_url = config.node_uri()?.parse::<reqwest::Url>().map_err(|e| anyhow!(e))?;
    let provider = Arc::new(AlloyNodeProvider::new_http(node_url));
    let store = Arc::new(MongoStore::connect(&config.mongo.uri, &config.mongo.db).await?);

    info!(target: LOG_TARGET, "Creating store collection indexes");
    store.create_index(OPERATIONS, &[("operId", IndexOrder::Desc)], false).await?;
    store.create_index(OPERATIONS, &[("createdAt", IndexOrder::Desc)], false).await?;

    info!(target: LOG_TARGET, "Loading contracts");
    let registry = Arc::new(
        ContractRegistry::bootstrap(&config.addresses, config.omoc.as_ref(), provider.as_ref())
            .await?,
    );

    let mut scheduler = Scheduler::new();
    if let Some(schedule) = config.task(TASK_SCAN_RAW_TRANSACTIONS) {
        info!(target: LOG_TARGET, "Task enabled: {TASK_SCAN_RAW_TRANSACTIONS}");
        scheduler.add_task(
            TASK_SCAN_RAW_TRANSACTIONS,
            schedule,
            Arc::new(BlockWalker::raw(
                provider.clone(),
                store.clone(),
                registry.clone(),
                &config.scan_raw_transactions,
                config.debug,
            )),
        );
    }
    if let Some(schedule) = config.task(TASK_SCAN_LOGS) {
        info!(target: LOG_TARGET, "Task enabled: {TASK_SCAN_LOGS}");
        scheduler.add_task(
            TASK_SCAN_LOGS,
            schedule,
            Arc::new(EventDispatcher::new(provider.clone(), store.clone(), registry.clone())),
        );
    }
    if let Some(schedule) = config.task(TASK_SCAN_TX_STATUS) {
        info!(target: LOG_TARGET, "Task enabled: {TASK_SCAN_TX_STATUS}");
        scheduler.add_task(
            TASK_SCAN_TX_STATUS,
            schedule,
            Arc::new(StatusAdvancer::new(
                provider.clone(),
                store.clone(),
                &config.scan_tx_status,
            )),
        );
    }
    if let Some(schedule) = config.task(TASK_SCAN_RAW_TRANSACTIONS_CONFIRMING) {
        info!(target: LOG_TARGET, "Task enabled: {TASK_SCAN_RAW_TRANSACTIONS_CONFIRMING}");
        scheduler.add_task(
            TASK_SCAN_RAW_TRANSACTIONS_CONFIRMING,
            schedule,
            Arc::new(BlockWalker::confirming(
                provider.clone(),
                store.clone(),
                registry.clone(),
                &config.scan_raw_transactions_confirming,
                config.debug,
            )),
        );
    }

    info!(target: LOG_TARGET, "Scheduling {} indexer tasks", scheduler.len());
    tokio::select! {
        _ = scheduler.run() => {
            error!(target: LOG_TARGET, "Scheduler stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!(target: LOG_TARGET, "Interrupt received, shutting down");
        }
    }
    Ok(())
}
