//! Settings exchange with the host UI.
//!
//! The plugin advertises a JSON schema describing its options and accepts a
//! JSON object carrying chosen values.  Only two options exist:
//!
//! | Key             | Type     | Default  | Range              |
//! |-----------------|----------|----------|--------------------|
//! | `enable_buffer` | checkbox | `false`  | —                  |
//! | `buffer_size`   | spin     | `230400` | `23520..=23520000` |
//!
//! Unknown keys in a payload are ignored.  Applied settings take effect on
//! the next `open`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PluginError, Result};
use crate::session::Direction;

pub const DEFAULT_BUFFER_SIZE: usize = 230_400;
pub const MIN_BUFFER_SIZE:     usize = 23_520;
pub const MAX_BUFFER_SIZE:     usize = 23_520_000;

// ── BufferSettings ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSettings {
    pub enable_buffer: bool,
    pub buffer_size:   usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            enable_buffer: false,
            buffer_size:   DEFAULT_BUFFER_SIZE,
        }
    }
}

impl BufferSettings {
    /// Apply a JSON settings payload on top of `self`.
    ///
    /// The payload must be an object.  Recognised keys must have the right
    /// type and range; on any error `self` is left unchanged.
    pub fn apply_json(&mut self, payload: &str) -> Result<()> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| PluginError::InvalidSettings(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| PluginError::InvalidSettings("payload is not a JSON object".into()))?;

        let mut next = *self;
        if let Some(v) = obj.get("enable_buffer") {
            next.enable_buffer = v
                .as_bool()
                .ok_or_else(|| PluginError::InvalidSettings("enable_buffer must be a boolean".into()))?;
        }
        if let Some(v) = obj.get("buffer_size") {
            let size = v
                .as_u64()
                .ok_or_else(|| PluginError::InvalidSettings("buffer_size must be a non-negative integer".into()))?;
            let size = usize::try_from(size)
                .map_err(|_| PluginError::InvalidSettings("buffer_size does not fit in memory".into()))?;
            if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&size) {
                return Err(PluginError::InvalidSettings(format!(
                    "buffer_size {size} outside {MIN_BUFFER_SIZE}..={MAX_BUFFER_SIZE}"
                )));
            }
            next.buffer_size = size;
        }
        *self = next;
        Ok(())
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Checkbox,
    Spin,
}

/// Description of one configurable option as shown by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    #[serde(rename = "type")]
    pub kind:        OptionKind,
    pub description: String,
    pub tooltip:     String,
    pub default:     Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min:         Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max:         Option<u64>,
}

pub type SettingsSchema = BTreeMap<String, OptionSchema>;

/// Schema advertised for sessions opened in `direction`.
pub fn schema(direction: Direction) -> SettingsSchema {
    let (verb, noun) = match direction {
        Direction::Read  => ("read", "Read"),
        Direction::Write => ("write", "Write"),
    };

    let mut s = SettingsSchema::new();
    s.insert("enable_buffer".into(), OptionSchema {
        kind:        OptionKind::Checkbox,
        description: format!("Enable {verb} buffer"),
        tooltip:     format!("Enable a buffer memory to speed up the {verb} process"),
        default:     Value::Bool(false),
        min:         None,
        max:         None,
    });
    s.insert("buffer_size".into(), OptionSchema {
        kind:        OptionKind::Spin,
        description: format!("{noun} buffer size"),
        tooltip:     format!("Set the amount of memory reserved for the {verb} buffer"),
        default:     Value::from(DEFAULT_BUFFER_SIZE as u64),
        min:         Some(MIN_BUFFER_SIZE as u64),
        max:         Some(MAX_BUFFER_SIZE as u64),
    });
    s
}

pub fn schema_json(direction: Direction) -> String {
    // A map of plain structs with string keys always serialises.
    serde_json::to_string_pretty(&schema(direction)).unwrap_or_default()
}
