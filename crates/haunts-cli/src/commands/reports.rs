//! Report command implementations

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use haunts_core::db::Database;
use haunts_core::{EngineConfig, ReportTimeZone, SpendReports};

use super::{print_json, resolve_category, truncate};

/// Resolve a named period (or explicit dates) into an inclusive date range,
/// with "today" taken from the report calendar
pub fn resolve_period(
    period: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
    timezone: ReportTimeZone,
) -> Result<(NaiveDate, NaiveDate)> {
    // If custom dates provided, use those
    if let (Some(from), Some(to)) = (custom_from, custom_to) {
        let from_date = NaiveDate::parse_from_str(from, "%Y-%m-%d")
            .context("Invalid --from date format (use YYYY-MM-DD)")?;
        let to_date = NaiveDate::parse_from_str(to, "%Y-%m-%d")
            .context("Invalid --to date format (use YYYY-MM-DD)")?;
        return Ok((from_date, to_date));
    }

    let today = timezone.date_of(Utc::now());
    resolve_named_period(period, today)
}

fn resolve_named_period(period: &str, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let month_start = |year: i32, month: u32| {
        NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Invalid month {}-{}", year, month))
    };
    let (prev_year, prev_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    match period.to_lowercase().as_str() {
        "this-month" => Ok((month_start(today.year(), today.month())?, today)),
        "last-month" => {
            let this_month = month_start(today.year(), today.month())?;
            Ok((month_start(prev_year, prev_month)?, this_month - Duration::days(1)))
        }
        "this-year" => Ok((month_start(today.year(), 1)?, today)),
        "last-30-days" => Ok((today - Duration::days(30), today)),
        "last-90-days" => Ok((today - Duration::days(90), today)),
        "last-12-months" => Ok((month_start(today.year() - 1, today.month())?, today)),
        "all" => Ok((month_start(1970, 1)?, today)),
        _ => anyhow::bail!("Unknown period: {}. Available: this-month, last-month, this-year, last-30-days, last-90-days, last-12-months, all", period),
    }
}

pub fn cmd_report_categories(
    db: &Database,
    config: &EngineConfig,
    owner: &str,
    from: NaiveDate,
    to: NaiveDate,
    json: bool,
) -> Result<()> {
    let timezone = config.timezone;
    let start = timezone.day_start(from)?;
    let end = timezone.day_start(to + Duration::days(1))? - Duration::milliseconds(1);

    let totals = SpendReports::with_timezone(db, timezone).aggregate_by_category(owner, start, end)?;

    if json {
        return print_json(&serde_json::json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "categories": totals,
        }));
    }

    println!();
    println!("📊 Spending by Category");
    println!("   Period: {} to {}", from, to);
    println!("   ─────────────────────────────────────────────────────────────");

    if totals.is_empty() {
        println!("   No spending found in this period.");
        return Ok(());
    }

    let grand_total: f64 = totals.iter().map(|t| t.total).sum();
    println!("   Total: {:.2}", grand_total);
    println!();
    println!(
        "   {:25} │ {:>10} │ {:>6} │ {:>5}",
        "Category", "Amount", "%", "Count"
    );
    println!("   ──────────────────────────┼────────────┼────────┼───────");

    for total in &totals {
        let percentage = if grand_total > 0.0 {
            total.total / grand_total * 100.0
        } else {
            0.0
        };
        println!(
            "   {:25} │ {:>10.2} │ {:>5.1}% │ {:>5}",
            truncate(&total.category, 25),
            total.total,
            percentage,
            total.count
        );
    }

    Ok(())
}

pub fn cmd_report_months(
    db: &Database,
    config: &EngineConfig,
    owner: &str,
    months: u32,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let category_id = category
        .map(|c| resolve_category(db, owner, c))
        .transpose()?;

    let report =
        SpendReports::with_timezone(db, config.timezone).aggregate_by_month(owner, months, category_id)?;

    if json {
        return print_json(&serde_json::to_value(&report)?);
    }

    println!();
    println!("📈 Monthly Spending (last {} months)", months);
    if let Some(category) = category {
        println!("   Category: {}", category);
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if report.is_empty() {
        println!("   No spending data found.");
        return Ok(());
    }

    println!("   {:12} │ {:>10} │ {:>5}", "Month", "Amount", "Count");
    println!("   ─────────────┼────────────┼───────");

    for point in &report {
        println!(
            "   {:12} │ {:>10.2} │ {:>5}",
            point.month.to_string(),
            point.total,
            point.count
        );
    }

    let total_amount: f64 = report.iter().map(|p| p.total).sum();
    let total_count: i64 = report.iter().map(|p| p.count).sum();

    println!("   ─────────────┼────────────┼───────");
    println!(
        "   {:12} │ {:>10.2} │ {:>5}",
        "Total", total_amount, total_count
    );

    Ok(())
}
