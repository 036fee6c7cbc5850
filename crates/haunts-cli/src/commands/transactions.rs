//! Transaction command implementations

use anyhow::{Context, Result};
use haunts_core::db::Database;
use haunts_core::models::{MergeOutcome, NewTransaction, TransactionSource};
use haunts_core::{EngineConfig, Ledger};

use super::{category_label, print_json, resolve_category, truncate};
use crate::cli::SpendArgs;

pub fn cmd_spend(
    db: &Database,
    config: &EngineConfig,
    owner: &str,
    args: &SpendArgs,
    json: bool,
) -> Result<()> {
    let source: TransactionSource = args
        .source
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let category_id = args
        .category
        .as_deref()
        .map(|c| resolve_category(db, owner, c))
        .transpose()?;

    let tx = NewTransaction {
        category_id,
        name: args.name.clone(),
        latitude: args.lat,
        longitude: args.lon,
        source,
        ..NewTransaction::spend(owner, args.amount)
    };

    let ledger = Ledger::with_radii(db, config.radius);
    let recorded = ledger
        .record(&tx, args.place)
        .context("Failed to record transaction")?;

    if json {
        return print_json(&serde_json::to_value(&recorded)?);
    }

    println!(
        "✅ Recorded {:.2} ({}) as transaction {}",
        args.amount,
        category_label(db, category_id)?,
        recorded.transaction_id
    );
    match recorded.location {
        Some(MergeOutcome::Created { id }) => {
            println!("   📍 New place remembered (place {})", id);
        }
        Some(MergeOutcome::Merged { id, visit_count }) => {
            println!("   📍 Back at place {} (visit #{})", id, visit_count);
        }
        None => {}
    }

    Ok(())
}

pub fn cmd_transactions_list(db: &Database, owner: &str, limit: i64, json: bool) -> Result<()> {
    let transactions = db.list_transactions(owner, limit, 0)?;

    if json {
        return print_json(&serde_json::to_value(&transactions)?);
    }

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  haunts spend --amount 12.50 --category Lunch");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let place = match (tx.latitude, tx.longitude) {
            (Some(lat), Some(lon)) => format!(" @ {:.5},{:.5}", lat, lon),
            _ => String::new(),
        };
        println!(
            "   [{:>4}] {} │ {:>10.2} │ {:12} │ {}{}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M"),
            tx.amount,
            truncate(&category_label(db, tx.category_id)?, 12),
            truncate(tx.name.as_deref().unwrap_or(""), 30),
            place
        );
    }

    Ok(())
}

pub fn cmd_transactions_delete(db: &Database, owner: &str, id: i64) -> Result<()> {
    if !db.delete_transaction(owner, id)? {
        anyhow::bail!("Transaction {} not found", id);
    }
    println!("🗑️  Deleted transaction {}", id);
    Ok(())
}
