//! Soft validation of model replies into typed stage outputs.
//!
//! Nothing here rejects a reply. Missing keys are filled with defaults and
//! odd shapes are coerced, so a half-formed answer still yields a usable
//! record.

use crate::llm::LlmOutput;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys expected in a stage-2 recommendation reply.
pub const RECOMMENDATION_KEYS: [&str; 4] = ["methods", "thresholds", "workflow", "notes"];

/// Keys expected in a stage-3 visual plan reply.
pub const VISUAL_PLAN_KEYS: [&str; 4] = ["chosen_method", "reason", "visuals", "interpretation_focus"];

/// Keys defaulted to an empty list rather than an empty string.
const LIST_KEYS: [&str; 2] = ["segments", "features"];

/// Coerce a reply into a JSON object carrying every expected key.
///
/// No reply → empty map. A non-object reply → `{"raw": <text>}`. An object
/// gets missing keys filled: `[]` for list keys, `""` for the rest.
pub fn validate_json_output(output: Option<&LlmOutput>, expected_keys: &[&str]) -> Map<String, Value> {
    let mut map = match output {
        None => return Map::new(),
        Some(LlmOutput::Text(text)) => {
            let mut m = Map::new();
            m.insert("raw".into(), Value::String(text.clone()));
            return m;
        }
        Some(LlmOutput::Json(Value::Object(obj))) => obj.clone(),
        Some(LlmOutput::Json(other)) => {
            let mut m = Map::new();
            m.insert("raw".into(), Value::String(other.to_string()));
            return m;
        }
    };

    for key in expected_keys {
        map.entry(key.to_string()).or_insert_with(|| {
            if LIST_KEYS.contains(key) {
                Value::Array(Vec::new())
            } else {
                Value::String(String::new())
            }
        });
    }
    map
}

/// A list field: arrays keep their items (non-strings stringified), a
/// non-blank string becomes one item, a blank string or null is empty,
/// other scalars become one item.
fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::String(_)) | Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(value_text).unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null      => String::new(),
        other            => other.to_string(),
    }
}

// ── Stage 2 ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recommendations {
    pub methods:    Vec<String>,
    pub thresholds: Vec<String>,
    pub workflow:   Vec<String>,
    pub notes:      String,
    /// The validated reply as received, extra keys included.
    pub raw:        Map<String, Value>,
}

impl Recommendations {
    pub fn from_validated(map: Map<String, Value>) -> Self {
        Self {
            methods:    string_list(&map, "methods"),
            thresholds: string_list(&map, "thresholds"),
            workflow:   string_list(&map, "workflow"),
            notes:      string_field(&map, "notes"),
            raw:        map,
        }
    }
}

// ── Stage 3 ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualPlan {
    pub chosen_method:        String,
    pub reason:               String,
    pub visuals:              Vec<String>,
    pub interpretation_focus: Vec<String>,
}

impl VisualPlan {
    pub fn from_validated(map: &Map<String, Value>) -> Self {
        Self {
            chosen_method:        string_field(map, "chosen_method"),
            reason:               string_field(map, "reason"),
            visuals:              string_list(map, "visuals"),
            interpretation_focus: string_list(map, "interpretation_focus"),
        }
    }
}
