//! Versioned JSON encoding of the engine state.
//!
//! The document is `{"version": N, ...state fields}`. Version 1 predates
//! the watermark map; loading it yields empty watermarks. Documents from a
//! newer build are refused rather than silently truncated.

use serde_json::{Map, Value};

use crate::engine::EngineState;
use crate::error::StorageError;

/// Key of the state document in the kv table.
pub const STATE_KEY: &str = "habitcan-state";

pub const CURRENT_VERSION: u32 = 2;

pub fn encode_state(state: &EngineState) -> Result<String, StorageError> {
    let mut value = serde_json::to_value(state).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("version".into(), Value::from(CURRENT_VERSION));
    }
    serde_json::to_string(&value).map_err(|e| StorageError::Corrupt(e.to_string()))
}

pub fn decode_state(raw: &str) -> Result<EngineState, StorageError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(StorageError::Corrupt("state document is not an object".into()));
    };

    let version = match map.remove("version") {
        None => 1,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| StorageError::Corrupt(format!("invalid version field: {v}")))?,
    };
    if version > CURRENT_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            supported: CURRENT_VERSION,
        });
    }
    if version < 2 {
        upgrade_v1(&mut map);
        tracing::info!(from = version, to = CURRENT_VERSION, "upgraded state document");
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| StorageError::Corrupt(e.to_string()))
}

fn upgrade_v1(map: &mut Map<String, Value>) {
    map.entry("watermarks").or_insert_with(|| Value::Array(Vec::new()));
}
