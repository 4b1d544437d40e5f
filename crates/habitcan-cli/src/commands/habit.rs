use clap::Subcommand;
use habitcan_core::{Config, DeleteOutcome, HabitDraft, HabitPatch, HabitRule};

use super::{open_engine, print_json, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// List all habits
    List,
    /// Show one habit
    Show {
        /// Habit ID
        id: String,
    },
    /// Create a user habit
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "❓")]
        emoji: String,
        /// Rule as JSON, e.g. '{"type":"manual"}'
        #[arg(long)]
        rule: String,
        /// Create the habit switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Update name, emoji or rule
    Update {
        /// Habit ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        emoji: Option<String>,
        /// Rule as JSON
        #[arg(long)]
        rule: Option<String>,
    },
    /// Delete a user habit and its occurrences
    Delete {
        /// Habit ID
        id: String,
    },
    /// Enable or disable a habit
    Toggle {
        /// Habit ID
        id: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn parse_rule(raw: &str) -> Result<HabitRule, Box<dyn std::error::Error>> {
    serde_json::from_str(raw).map_err(|e| format!("invalid rule JSON: {e}").into())
}

pub fn run(action: HabitAction) -> CliResult {
    let engine = open_engine(&Config::load()?)?;

    match action {
        HabitAction::List => print_json(&engine.list_habits())?,
        HabitAction::Show { id } => match engine.get_habit(&id) {
            Some(habit) => print_json(&habit)?,
            None => return Err(format!("habit not found: {id}").into()),
        },
        HabitAction::Create {
            name,
            emoji,
            rule,
            disabled,
        } => {
            let habit = engine.create_habit(HabitDraft {
                name,
                emoji,
                enabled: !disabled,
                rule: parse_rule(&rule)?,
            })?;
            print_json(&habit)?;
        }
        HabitAction::Update {
            id,
            name,
            emoji,
            rule,
        } => {
            let patch = HabitPatch {
                name,
                emoji,
                enabled: None,
                rule: rule.as_deref().map(parse_rule).transpose()?,
            };
            match engine.update_habit(&id, patch)? {
                Some(habit) => print_json(&habit)?,
                None => return Err(format!("habit not found: {id}").into()),
            }
        }
        HabitAction::Delete { id } => match engine.delete_habit(&id) {
            DeleteOutcome::Deleted => println!("deleted {id}"),
            DeleteOutcome::NotFound => return Err(format!("habit not found: {id}").into()),
            DeleteOutcome::RejectedPreset => {
                return Err(format!("{id} is a preset; disable it with `habit toggle` instead").into())
            }
        },
        HabitAction::Toggle { id, enabled } => match engine.toggle_habit(&id, enabled) {
            Some(habit) => print_json(&habit)?,
            None => return Err(format!("habit not found: {id}").into()),
        },
    }
    Ok(())
}
