//! Engine configuration.
//!
//! The original reference implementation hard-codes the watermark pipeline
//! name and the default database location as module-level constants (spec
//! §9 Design Note: "Mutable process-wide defaults → config struct"). Here
//! they are fields of `EngineConfig`, constructed with sane defaults and
//! optionally overridden from a `bitemporal.toml` file — the same pattern
//! decapod uses for its `proofs.toml`/`ProofConfig`.

use crate::core::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction-time configuration for the bi-temporal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the watermark pipeline row (`watermarks.name`). Defaults to
    /// `"event_time"`, matching the reference implementation.
    pub watermark_name: String,
    /// Default SQLite database filename, relative to the working directory
    /// unless an absolute path is given on the CLI.
    pub db_path: String,
    /// When false, facts at or before the current watermark are skipped
    /// rather than merged (spec §4.4 late-arrival gate).
    pub allow_late: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watermark_name: "event_time".to_string(),
            db_path: crate::core::schemas::DB_NAME.to_string(),
            allow_late: true,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file, falling back to defaults for
    /// any field the file does not set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads from `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_watermark_name() {
        assert_eq!(EngineConfig::default().watermark_name, "event_time");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = EngineConfig::load_or_default("/nonexistent/bitemporal.toml").unwrap();
        assert_eq!(cfg.watermark_name, "event_time");
    }

    #[test]
    fn test_load_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bitemporal.toml");
        std::fs::write(&path, "watermark_name = \"ingest_time\"\n").unwrap();
        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.watermark_name, "ingest_time");
        assert_eq!(cfg.db_path, crate::core::schemas::DB_NAME);
    }
}
