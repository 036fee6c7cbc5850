//! Remembered place command implementations

use anyhow::Result;
use haunts_core::db::Database;
use haunts_core::models::NearbyLocation;
use haunts_core::{EngineConfig, LocationMemory};

use super::{category_label, print_json, truncate};

pub fn cmd_places_list(db: &Database, owner: &str, json: bool) -> Result<()> {
    let places = db.list_locations(owner)?;

    if json {
        return print_json(&serde_json::to_value(&places)?);
    }

    if places.is_empty() {
        println!("No remembered places yet. Record a spend with --lat/--lon to add one.");
        return Ok(());
    }

    println!();
    println!("📍 Remembered Places");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:>6} │ {:>21} │ {:>6} │ {:>10} │ {}",
        "ID", "Coordinate", "Visits", "Amount", "Category"
    );

    for place in &places {
        println!(
            "   {:>6} │ {:>10.5},{:>10.5} │ {:>6} │ {:>10.2} │ {}{}",
            place.id,
            place.latitude,
            place.longitude,
            place.visit_count,
            place.amount,
            category_label(db, place.category_id)?,
            place
                .name
                .as_deref()
                .map(|n| format!(" ({})", truncate(n, 24)))
                .unwrap_or_default()
        );
    }

    Ok(())
}

pub fn cmd_places_nearby(
    db: &Database,
    config: &EngineConfig,
    owner: &str,
    lat: f64,
    lon: f64,
    radius: Option<f64>,
    json: bool,
) -> Result<()> {
    let radius = radius.unwrap_or(config.radius.suggest_meters);
    let nearby = LocationMemory::with_radii(db, config.radius).find_all_within(owner, lat, lon, radius)?;

    if json {
        return print_json(&serde_json::to_value(&nearby)?);
    }

    if nearby.is_empty() {
        println!("Nothing remembered within {} m.", radius);
        return Ok(());
    }

    println!();
    println!("🧭 Places within {} m", radius);
    println!("   ─────────────────────────────────────────────────────────────");
    for place in &nearby {
        print_nearby(db, place)?;
    }

    Ok(())
}

pub fn cmd_places_nearest(
    db: &Database,
    config: &EngineConfig,
    owner: &str,
    lat: f64,
    lon: f64,
    radius: Option<f64>,
    json: bool,
) -> Result<()> {
    let radius = radius.unwrap_or(config.radius.merge_meters);
    let nearest = LocationMemory::with_radii(db, config.radius).find_nearest(owner, lat, lon, radius)?;

    if json {
        return print_json(&serde_json::to_value(&nearest)?);
    }

    match nearest {
        Some(place) => print_nearby(db, &place)?,
        None => println!("Nothing remembered within {} m; a spend here creates a new place.", radius),
    }

    Ok(())
}

pub fn cmd_places_delete(db: &Database, owner: &str, id: i64) -> Result<()> {
    if !db.delete_location(owner, id)? {
        anyhow::bail!("Place {} not found", id);
    }
    println!("🗑️  Forgot place {}", id);
    Ok(())
}

fn print_nearby(db: &Database, place: &NearbyLocation) -> Result<()> {
    let loc = &place.location;
    println!(
        "   [{:>4}] {:>7.1} m │ {:>10.2} │ {} │ {} visit(s){}",
        loc.id,
        place.distance_meters,
        loc.amount,
        category_label(db, loc.category_id)?,
        loc.visit_count,
        loc.name
            .as_deref()
            .map(|n| format!(" │ {}", truncate(n, 24)))
            .unwrap_or_default()
    );
    Ok(())
}
