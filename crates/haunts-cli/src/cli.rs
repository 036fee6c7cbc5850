//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Haunts - Remember where you spend
#[derive(Parser)]
#[command(name = "haunts")]
#[command(about = "Spending tracker that remembers the places you spend at", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "haunts.db", global = true)]
    pub db: PathBuf,

    /// User whose records are read and written
    #[arg(long, default_value = "me", global = true)]
    pub owner: String,

    /// Config file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and show the active configuration
    Init,

    /// Manage categories (list, add, delete)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Record a spend, remembering where it happened
    Spend(SpendArgs),

    /// Manage transactions (list, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage remembered places (list, nearby, nearest, delete)
    Places {
        #[command(subcommand)]
        action: Option<PlacesAction>,
    },

    /// Generate spending reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,
    },

    /// Delete a category (its transactions become uncategorized)
    Delete {
        /// Category ID
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SpendArgs {
    /// Amount spent (must be positive)
    #[arg(short, long)]
    pub amount: f64,

    /// Category name or ID
    #[arg(short, long)]
    pub category: Option<String>,

    /// Free-text description
    #[arg(short, long)]
    pub name: Option<String>,

    /// Latitude of where the money was spent
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of where the money was spent
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Merge into this remembered place instead of the nearest one
    #[arg(long, requires = "lat")]
    pub place: Option<i64>,

    /// Where the entry came from: web or api
    #[arg(long, default_value = "web")]
    pub source: String,
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum PlacesAction {
    /// List remembered places, most visited first
    List,

    /// Places within the suggestion radius of a coordinate
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters (defaults to the configured suggestion radius)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// The place a spend at this coordinate would merge into
    Nearest {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Search radius in meters (defaults to the configured merge radius)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Forget a remembered place
    Delete {
        /// Place ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Spending by category
    Categories {
        /// Time period: this-month, last-month, this-year, last-30-days, last-90-days,
        /// last-12-months, all
        #[arg(long, default_value = "this-month")]
        period: String,

        /// Custom start date (YYYY-MM-DD) - overrides period
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Custom end date (YYYY-MM-DD) - overrides period
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Spending per calendar month
    Months {
        /// Number of months, including the current one
        #[arg(long, default_value = "6")]
        months: u32,

        /// Restrict to one category (name or ID)
        #[arg(long)]
        category: Option<String>,
    },
}
