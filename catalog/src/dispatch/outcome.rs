//! Normalized execution results.

use serde::Serialize;
use serde_json::{Map, Value};

const DATA_KEY: &str = "data";
const PAYLOAD_KEY: &str = "payload";
const ERROR_KEY: &str = "error";
const SUCCESS_KEYS: [&str; 2] = ["successful", "success"];

/// What the host protocol layer returns for a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub payload: Value,
    pub is_error: bool,
}

impl ExecutionOutcome {
    pub fn success(payload: Value) -> Self {
        Self {
            payload,
            is_error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            payload: Value::String(message.into()),
            is_error: true,
        }
    }

    /// Normalize an upstream response.
    ///
    /// Objects carrying any of `data`, `payload`, `successful`, `success` or
    /// `error` are treated as an envelope: an explicit success flag wins,
    /// otherwise a non-null `error` marks failure. `data` is preferred over
    /// `payload` when both are present. Anything else is a bare payload.
    pub fn from_upstream(response: Value) -> Self {
        let mut map = match response {
            Value::Object(map) if is_envelope(&map) => map,
            other => return Self::success(other),
        };

        let flag = SUCCESS_KEYS
            .iter()
            .find_map(|key| map.remove(*key))
            .and_then(|v| v.as_bool());
        // Drop the other spelling if both were present.
        for key in SUCCESS_KEYS {
            map.remove(key);
        }
        let error = map.remove(ERROR_KEY).filter(|e| !e.is_null());
        let alternate = map.remove(PAYLOAD_KEY);
        let data = match map.remove(DATA_KEY) {
            Some(data) if !data.is_null() || alternate.is_none() => Some(data),
            _ => alternate,
        };

        let is_error = match flag {
            Some(successful) => !successful,
            None => error.is_some(),
        };

        let payload = if is_error {
            error
                .or(data.filter(|d| !d.is_null()))
                .unwrap_or_else(|| Value::String("Operation failed".to_string()))
        } else {
            match data {
                Some(data) => data,
                None if !map.is_empty() => Value::Object(map),
                None => Value::Null,
            }
        };

        Self { payload, is_error }
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.contains_key(DATA_KEY)
        || map.contains_key(PAYLOAD_KEY)
        || map.contains_key(ERROR_KEY)
        || SUCCESS_KEYS.iter().any(|k| map.contains_key(*k))
}
