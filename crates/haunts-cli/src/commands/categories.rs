//! Category command implementations

use anyhow::Result;
use haunts_core::db::Database;

use super::print_json;

pub fn cmd_categories_list(db: &Database, owner: &str, json: bool) -> Result<()> {
    let categories = db.list_categories(owner)?;

    if json {
        return print_json(&serde_json::to_value(&categories)?);
    }

    if categories.is_empty() {
        println!("No categories yet. Add one with:");
        println!("  haunts categories add Groceries");
        return Ok(());
    }

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");
    for category in &categories {
        println!("   [{:>4}] {}", category.id, category.name);
    }

    Ok(())
}

pub fn cmd_categories_add(db: &Database, owner: &str, name: &str, json: bool) -> Result<()> {
    let id = db.create_category(owner, name)?;

    if json {
        return print_json(&serde_json::json!({ "id": id, "name": name.trim() }));
    }
    println!("✅ Added category '{}' (id {})", name.trim(), id);
    Ok(())
}

pub fn cmd_categories_delete(db: &Database, owner: &str, id: i64) -> Result<()> {
    let category = db
        .get_category(id)?
        .filter(|c| c.owner == owner)
        .ok_or_else(|| anyhow::anyhow!("Category {} not found", id))?;

    db.delete_category(owner, id)?;
    println!(
        "🗑️  Deleted category '{}'; its transactions are now uncategorized",
        category.name
    );
    Ok(())
}
