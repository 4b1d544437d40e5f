use chrono::NaiveDate;
use clap::Subcommand;
use habitcan_core::{Config, MAX_MANUAL_COUNT};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum OccurrenceAction {
    /// Record manual occurrences
    Record {
        /// Habit ID
        habit_id: String,
        /// Sleep-day (YYYY-MM-DD), defaults to the current one
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_MANUAL_COUNT))
        )]
        count: u32,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Occurrences on one sleep-day
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Occurrences in an inclusive date range
    Range {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Delete the record for one habit and day
    Delete {
        /// Habit ID
        habit_id: String,
        #[arg(long)]
        date: NaiveDate,
    },
}

pub fn run(action: OccurrenceAction) -> CliResult {
    let engine = open_engine(&Config::load()?)?;

    match action {
        OccurrenceAction::Record {
            habit_id,
            date,
            count,
            reason,
        } => {
            let date = date.unwrap_or_else(|| engine.today());
            match engine.record_manual_occurrence(&habit_id, date, count, &reason) {
                Some(occ) => print_json(&occ)?,
                None => return Err(format!("nothing recorded for {habit_id} (unknown habit or zero count)").into()),
            }
        }
        OccurrenceAction::List { date } => {
            let date = date.unwrap_or_else(|| engine.today());
            print_json(&engine.occurrences_by_date(date))?;
        }
        OccurrenceAction::Range { start, end } => {
            print_json(&engine.occurrences_by_range(start, end))?;
        }
        OccurrenceAction::Delete { habit_id, date } => {
            if !engine.delete_occurrence(&habit_id, date) {
                return Err(format!("no occurrence for {habit_id} on {date}").into());
            }
            println!("deleted {habit_id} {date}");
        }
    }
    Ok(())
}
