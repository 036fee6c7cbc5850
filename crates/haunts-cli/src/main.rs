//! Haunts CLI - Spending tracker with location memory
//!
//! Usage:
//!   haunts init                                  Initialize database
//!   haunts spend --amount 4.5 --lat .. --lon ..  Record a spend at a place
//!   haunts places nearby --lat .. --lon ..       Places you have spent at nearby
//!   haunts report months --months 6              Monthly spending

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    let owner = cli.owner.as_str();
    let json = cli.json;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, &config, json),
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(CategoriesAction::List) => {
                    commands::cmd_categories_list(&db, owner, json)
                }
                Some(CategoriesAction::Add { name }) => {
                    commands::cmd_categories_add(&db, owner, &name, json)
                }
                Some(CategoriesAction::Delete { id }) => {
                    commands::cmd_categories_delete(&db, owner, id)
                }
            }
        }
        Commands::Spend(args) => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_spend(&db, &config, owner, &args, json)
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_transactions_list(&db, owner, 20, json),
                Some(TransactionsAction::List { limit }) => {
                    commands::cmd_transactions_list(&db, owner, limit, json)
                }
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, owner, id)
                }
            }
        }
        Commands::Places { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(PlacesAction::List) => commands::cmd_places_list(&db, owner, json),
                Some(PlacesAction::Nearby { lat, lon, radius }) => {
                    commands::cmd_places_nearby(&db, &config, owner, lat, lon, radius, json)
                }
                Some(PlacesAction::Nearest { lat, lon, radius }) => {
                    commands::cmd_places_nearest(&db, &config, owner, lat, lon, radius, json)
                }
                Some(PlacesAction::Delete { id }) => commands::cmd_places_delete(&db, owner, id),
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db)?;
            match report_type {
                ReportType::Categories { period, from, to } => {
                    let (from_date, to_date) = commands::resolve_period(
                        &period,
                        from.as_deref(),
                        to.as_deref(),
                        config.timezone,
                    )?;
                    commands::cmd_report_categories(&db, &config, owner, from_date, to_date, json)
                }
                ReportType::Months { months, category } => commands::cmd_report_months(
                    &db,
                    &config,
                    owner,
                    months,
                    category.as_deref(),
                    json,
                ),
            }
        }
    }
}
