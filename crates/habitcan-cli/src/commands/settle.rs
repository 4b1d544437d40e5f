use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use habitcan_core::Config;

use super::{open_engine_with_timeline, print_json, CliResult};

#[derive(Args)]
pub struct SettleArgs {
    /// Sleep-day to settle (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Timeline JSON document with tasks and timeout counters; without it
    /// no rule is evaluated
    #[arg(long)]
    pub timeline: Option<PathBuf>,
}

pub fn run(args: SettleArgs) -> CliResult {
    let config = Config::load()?;
    let engine = open_engine_with_timeline(&config, args.timeline.as_deref())?;
    print_json(&engine.settle_date(args.date))
}
