use clap::Subcommand;
use habitcan_core::Config;

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum ReportAction {
    /// Build (or rebuild) and store the report for a month
    Generate { year: i32, month: u32 },
    /// Show a stored report
    Show { year: i32, month: u32 },
}

pub fn run(action: ReportAction) -> CliResult {
    let engine = open_engine(&Config::load()?)?;

    match action {
        ReportAction::Generate { year, month } => match engine.generate_monthly_report(year, month) {
            Some(report) => print_json(&report)?,
            None => return Err(format!("invalid month: {year}-{month}").into()),
        },
        ReportAction::Show { year, month } => match engine.monthly_report(year, month) {
            Some(report) => print_json(&report)?,
            None => return Err(format!("no report for {year}-{month:02}; run `report generate` first").into()),
        },
    }
    Ok(())
}
