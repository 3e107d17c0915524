// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Explicit configuration for indices, engines and backends.
//!
//! Nothing here is global: each struct is built (or loaded) by the caller and
//! passed by value to the object it configures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A setting holds a value its consumer cannot work with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsError {
    /// Name of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid setting '{}': {}", self.field, self.message)
    }
}

impl std::error::Error for SettingsError {}

/// Render index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Width of the instance id space. Ids run from `1` to `2^bits - 1`.
    pub prim_id_bits: u32,
}

impl IndexSettings {
    /// Largest id representable with the configured width.
    pub fn max_prim_id(&self) -> u32 {
        if self.prim_id_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.prim_id_bits) - 1
        }
    }

    /// Checks that the bit width is within `1..=32`.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if (1..=32).contains(&self.prim_id_bits) {
            Ok(())
        } else {
            Err(SettingsError {
                field: "prim_id_bits",
                message: format!("{} is outside 1..=32", self.prim_id_bits),
            })
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { prim_id_bits: 24 }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Log the duration of each phase at debug level.
    pub log_phase_timings: bool,
}

/// Configuration of the stream backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Pending sources above this count are resolved on worker threads.
    pub parallel_resolve_threshold: usize,
    /// Reclaim unused dispatch buffers during garbage collection.
    pub collect_dispatch_buffers: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            parallel_resolve_threshold: 64,
            collect_dispatch_buffers: true,
        }
    }
}

/// Aggregate configuration, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Render index settings.
    pub index: IndexSettings,
    /// Engine settings.
    pub engine: EngineSettings,
    /// Stream backend settings.
    pub stream: StreamSettings,
}

impl StrataConfig {
    /// Load configuration from a JSON string. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StrataConfig::default();
        assert_eq!(config.index.prim_id_bits, 24);
        assert_eq!(config.index.max_prim_id(), 0x00ff_ffff);
        assert!(!config.engine.log_phase_timings);
        assert!(config.stream.collect_dispatch_buffers);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = StrataConfig::from_json(r#"{ "index": { "prim_id_bits": 2 } }"#).unwrap();
        assert_eq!(config.index.prim_id_bits, 2);
        assert_eq!(config.index.max_prim_id(), 3);
        assert_eq!(config.stream, StreamSettings::default());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(IndexSettings { prim_id_bits: 0 }.validate().is_err());
        assert!(IndexSettings { prim_id_bits: 33 }.validate().is_err());
        assert!(IndexSettings { prim_id_bits: 32 }.validate().is_ok());
        assert_eq!(IndexSettings { prim_id_bits: 32 }.max_prim_id(), u32::MAX);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.json");
        let config = StrataConfig {
            engine: EngineSettings {
                log_phase_timings: true,
            },
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(StrataConfig::from_file(&path).unwrap(), config);
    }
}
