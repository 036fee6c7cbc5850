//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the engine configuration
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use haunts_core::config::default_config_path;
use haunts_core::{db::Database, EngineConfig};

use super::print_json;

/// Open (creating if needed) the database at `db_path`
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Explicit `--config` file, else the data-dir override, else built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => EngineConfig::load().context("Failed to load config"),
    }
}

pub fn cmd_init(db_path: &Path, config: &EngineConfig, json: bool) -> Result<()> {
    let db = open_db(db_path)?;

    if json {
        return print_json(&serde_json::json!({
            "database": db.path(),
            "radius": {
                "suggest_meters": config.radius.suggest_meters,
                "merge_meters": config.radius.merge_meters,
            },
            "reports": {
                "timezone": config.timezone.to_string(),
            },
        }));
    }

    println!("🔧 Database ready at {}", db_path.display());
    println!("   Suggestion radius: {} m", config.radius.suggest_meters);
    println!("   Merge radius:      {} m", config.radius.merge_meters);
    println!("   Report calendar:   {}", config.timezone);
    if let Some(path) = default_config_path() {
        println!("   Config override:   {}", path.display());
    }

    println!();
    println!("Next steps:");
    println!("  1. Add a category: haunts categories add Coffee");
    println!("  2. Record a spend: haunts spend --amount 4.50 --category Coffee --lat 22.28 --lon 114.15");

    Ok(())
}
