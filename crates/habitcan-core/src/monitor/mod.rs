//! Drivers that invoke the rule evaluator on their own cadence.
//!
//! - [`RealtimeMonitor`]: fixed-interval poll of the open sleep-day, plus an
//!   immediate re-run whenever a timeline [`Event`](crate::events::Event)
//!   arrives.
//! - [`SettlementScheduler`]: one run shortly after midnight that settles
//!   the sleep-day that just closed, then one per period.
//!
//! Both share one [`HabitEngine`](crate::engine::HabitEngine) and never talk
//! to each other; dedupe happens through the engine's watermarks.

mod realtime;
mod settlement;

pub use realtime::RealtimeMonitor;
pub use settlement::{delay_until_next, SettlementScheduler};

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

/// Source of local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The system clock in local time.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// A clock frozen at `at`.
pub fn fixed_clock(at: NaiveDateTime) -> Clock {
    Arc::new(move || at)
}
