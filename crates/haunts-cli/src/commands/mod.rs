//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `categories` - Category commands (list, add, delete)
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `places` - Remembered place commands (list, nearby, nearest, delete)
//! - `reports` - Report generation commands
//! - `transactions` - Spend recording and transaction commands (list, delete)

pub mod categories;
pub mod core;
pub mod places;
pub mod reports;
pub mod transactions;

// Re-export command functions for main.rs
pub use categories::*;
pub use core::*;
pub use places::*;
pub use reports::*;
pub use transactions::*;

use anyhow::{Context, Result};
use haunts_core::db::Database;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Pretty-print a JSON value to stdout
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

/// Resolve a category given by ID or by name to one of `owner`'s category IDs
pub fn resolve_category(db: &Database, owner: &str, name_or_id: &str) -> Result<i64> {
    if let Ok(id) = name_or_id.parse::<i64>() {
        if let Some(category) = db.get_category(id)? {
            if category.owner == owner {
                return Ok(category.id);
            }
        }
    }

    db.get_category_by_name(owner, name_or_id)?
        .map(|c| c.id)
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", name_or_id))
}

/// Display name for an optional category ID
pub fn category_label(db: &Database, category_id: Option<i64>) -> Result<String> {
    Ok(match category_id {
        Some(id) => db
            .get_category(id)?
            .map(|c| c.name)
            .unwrap_or_else(|| format!("#{}", id)),
        None => "-".to_string(),
    })
}
