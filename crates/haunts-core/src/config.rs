//! Engine configuration: search radii and the report calendar
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/haunts/config/haunts.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! An explicit path (`EngineConfig::from_path`) skips both and must exist.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::reports::ReportTimeZone;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/haunts.toml");

/// Search radii for the location memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusConfig {
    /// Radius for listing nearby places as suggestions
    pub suggest_meters: f64,
    /// Radius for silently picking a merge target
    pub merge_meters: f64,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            suggest_meters: 200.0,
            merge_meters: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    pub radius: RadiusConfig,
    /// Calendar used for month bucketing
    pub timezone: ReportTimeZone,
}

impl EngineConfig {
    /// Load the override file if present, otherwise the embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config override from {}", path.display());
                Self::from_path(&path)
            }
            _ => Self::parse(DEFAULT_CONFIG),
        }
    }

    /// Load from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidData(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Parse TOML content on top of the built-in defaults
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidData(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(radius) = raw.radius {
            if let Some(suggest) = radius.suggest_meters {
                config.radius.suggest_meters = suggest;
            }
            if let Some(merge) = radius.merge_meters {
                config.radius.merge_meters = merge;
            }
        }

        if let Some(reports) = raw.reports {
            if let Some(tz) = reports.timezone {
                config.timezone = tz
                    .parse()
                    .map_err(|e: String| Error::InvalidData(format!("Invalid config: {}", e)))?;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("radius.suggest_meters", self.radius.suggest_meters),
            ("radius.merge_meters", self.radius.merge_meters),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidData(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.radius.merge_meters > self.radius.suggest_meters {
            warn!(
                "merge radius ({} m) is wider than the suggestion radius ({} m); \
                 transactions may merge into places that were never suggested",
                self.radius.merge_meters, self.radius.suggest_meters
            );
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("haunts").join("config").join("haunts.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    radius: Option<RawRadius>,
    reports: Option<RawReports>,
}

#[derive(Debug, Deserialize)]
struct RawRadius {
    suggest_meters: Option<f64>,
    merge_meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawReports {
    timezone: Option<String>,
}
