use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Signals that make the realtime monitor re-evaluate immediately.
///
/// Timestamps are local wall-clock times, like task schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A task on the timeline was marked done.
    TaskCompleted {
        task_id: String,
        at: NaiveDateTime,
    },
    /// Tasks were added, edited, moved or removed.
    TimelineMutated {
        at: NaiveDateTime,
    },
    /// Periodic poll.
    Tick {
        at: NaiveDateTime,
    },
}

impl Event {
    pub fn at(&self) -> NaiveDateTime {
        match self {
            Event::TaskCompleted { at, .. } | Event::TimelineMutated { at } | Event::Tick { at } => *at,
        }
    }

    /// Whether the event is a periodic tick rather than a timeline change.
    pub fn is_tick(&self) -> bool {
        matches!(self, Event::Tick { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let at = NaiveDateTime::parse_from_str("2026-03-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        let event = Event::TaskCompleted { task_id: "t1".into(), at };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TaskCompleted");
        assert_eq!(json["task_id"], "t1");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back.at(), at);
        assert!(!back.is_tick());
    }
}
