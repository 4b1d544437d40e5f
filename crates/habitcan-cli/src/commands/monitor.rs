use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use habitcan_core::{Config, RealtimeMonitor, SettlementScheduler};
use tokio::sync::{mpsc, watch};

use super::{open_engine_with_timeline, CliResult};

#[derive(Args)]
pub struct MonitorArgs {
    /// Timeline JSON document with tasks and timeout counters, re-read on every pass
    #[arg(long)]
    pub timeline: PathBuf,
}

pub fn run(args: MonitorArgs) -> CliResult {
    let config = Config::load()?;
    let settle_at = config
        .settlement_time()
        .ok_or("settlement.hour/minute is not a valid clock time")?;
    let engine = Arc::new(open_engine_with_timeline(&config, Some(&args.timeline))?);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // nothing feeds events from the file timeline; polling picks edits up
        let (_events_tx, events_rx) = mpsc::channel(16);

        let realtime = RealtimeMonitor::new(engine.clone(), config.monitor_interval());
        let settlement = SettlementScheduler::new(engine, settle_at, config.settlement_period());

        let realtime = tokio::spawn(realtime.run(events_rx, shutdown_rx.clone()));
        let settlement = tokio::spawn(settlement.run(shutdown_rx));

        tracing::info!(timeline = %args.timeline.display(), "monitor running, Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down");
        shutdown_tx.send(true)?;

        let passes = realtime.await?;
        let settlements = settlement.await?;
        println!("{}", serde_json::json!({ "passes": passes, "settlements": settlements }));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
