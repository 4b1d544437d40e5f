use chrono::NaiveDate;
use clap::Subcommand;
use habitcan_core::Config;

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum AchievementAction {
    /// Achievements, optionally only those dated on one day
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: AchievementAction) -> CliResult {
    let engine = open_engine(&Config::load()?)?;

    match action {
        AchievementAction::List { date: Some(date) } => print_json(&engine.achievements_by_date(date))?,
        AchievementAction::List { date: None } => print_json(&engine.achievements())?,
    }
    Ok(())
}
