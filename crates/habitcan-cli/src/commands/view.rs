use chrono::NaiveDate;
use clap::Subcommand;
use habitcan_core::{Config, MAX_TREND_DAYS};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum ViewAction {
    /// Day aggregate and colour band
    Can {
        /// Sleep-day (YYYY-MM-DD), defaults to the current one
        date: Option<NaiveDate>,
    },
    /// Day aggregates for a whole month
    Month { year: i32, month: u32 },
    /// Seven days ending at a date
    Week { end: Option<NaiveDate> },
    /// Per-habit daily series
    Trend {
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Window length, defaults to `analytics.trend_days`
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TREND_DAYS)))]
        days: Option<u32>,
    },
    /// One habit over one month
    Heatmap {
        habit_id: String,
        year: i32,
        month: u32,
    },
    /// Habit with the most occurrences in a range
    Frequent {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
}

pub fn run(action: ViewAction) -> CliResult {
    let engine = open_engine(&Config::load()?)?;

    match action {
        ViewAction::Can { date } => {
            print_json(&engine.can_data(date.unwrap_or_else(|| engine.today())))?;
        }
        ViewAction::Month { year, month } => print_json(&engine.month_can_data(year, month))?,
        ViewAction::Week { end } => {
            print_json(&engine.week_view(end.unwrap_or_else(|| engine.today())))?;
        }
        ViewAction::Trend { end, days } => {
            print_json(&engine.trend(end.unwrap_or_else(|| engine.today()), days))?;
        }
        ViewAction::Heatmap {
            habit_id,
            year,
            month,
        } => match engine.heatmap(&habit_id, year, month) {
            Some(data) => print_json(&data)?,
            None => return Err(format!("no heatmap for {habit_id} in {year}-{month:02}").into()),
        },
        ViewAction::Frequent { start, end } => print_json(&engine.most_frequent_habit(start, end))?,
    }
    Ok(())
}
