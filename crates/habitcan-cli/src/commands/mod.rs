pub mod achievement;
pub mod config;
pub mod habit;
pub mod monitor;
pub mod occurrence;
pub mod report;
pub mod settle;
pub mod view;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use habitcan_core::storage::data_dir;
use habitcan_core::{Config, EngineSettings, FileTimeline, HabitEngine, SqliteStateStore};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Open the engine on the default database with settings from `config`.
pub fn open_engine(config: &Config) -> Result<HabitEngine, Box<dyn Error>> {
    let store = SqliteStateStore::open_at(&data_dir()?.join("habitcan.db"))?;
    Ok(HabitEngine::open(Box::new(store), EngineSettings::from_config(config))?)
}

/// Like [`open_engine`], with tasks read from a timeline file if given.
pub fn open_engine_with_timeline(
    config: &Config,
    timeline: Option<&Path>,
) -> Result<HabitEngine, Box<dyn Error>> {
    let engine = open_engine(config)?;
    Ok(match timeline {
        Some(path) => engine.with_provider(Arc::new(FileTimeline::new(path))),
        None => engine,
    })
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
