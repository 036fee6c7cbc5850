//! Domain models for Haunts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used for transactions that carry no category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Transaction source - how it was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    /// Entered interactively
    #[default]
    Web,
    /// Submitted by an external client
    Api,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Api => "api",
        }
    }
}

impl std::str::FromStr for TransactionSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "api" => Ok(Self::Api),
            _ => Err(format!("Unknown transaction source: {} (valid: web, api)", s)),
        }
    }
}

impl std::fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-owned label for transactions and remembered locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub owner: String,
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A spend event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner: String,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
    /// Coordinate captured when the transaction was entered (history only)
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source: TransactionSource,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A transaction to be recorded (before DB insertion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub owner: String,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source: TransactionSource,
    /// Defaults to the time of insertion
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    /// A web-entered spend with no category, name or coordinate
    pub fn spend(owner: impl Into<String>, amount: f64) -> Self {
        Self {
            owner: owner.into(),
            amount,
            category_id: None,
            name: None,
            latitude: None,
            longitude: None,
            source: TransactionSource::Web,
            created_at: None,
        }
    }

    /// The coordinate, when both halves are present
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A place the user has spent money before
///
/// The coordinate is the running mean of every visit merged into it; amount and
/// category are whatever the most recent visit carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RememberedLocation {
    pub id: i64,
    pub owner: String,
    pub latitude: f64,
    pub longitude: f64,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub visit_count: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// New remembered location for creation (visit count starts at 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRememberedLocation {
    pub owner: String,
    pub latitude: f64,
    pub longitude: f64,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
}

/// Full replacement of the mutable fields of a remembered location
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPatch {
    pub latitude: f64,
    pub longitude: f64,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub visit_count: i64,
}

/// A pending change to the location memory
#[derive(Debug, Clone)]
pub enum LocationWrite {
    Insert(NewRememberedLocation),
    /// Applied only while the stored visit count is still `expected_visit_count`
    Patch {
        id: i64,
        expected_visit_count: i64,
        patch: LocationPatch,
    },
}

impl LocationWrite {
    /// Outcome once the write has been applied to location `id`
    pub fn outcome(&self, id: i64) -> MergeOutcome {
        match self {
            LocationWrite::Insert(_) => MergeOutcome::Created { id },
            LocationWrite::Patch { patch, .. } => MergeOutcome::Merged {
                id,
                visit_count: patch.visit_count,
            },
        }
    }
}

/// A remembered location together with its distance from a query point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyLocation {
    #[serde(flatten)]
    pub location: RememberedLocation,
    pub distance_meters: f64,
}

/// One observation fed into the location memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationVisit {
    pub latitude: f64,
    pub longitude: f64,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub name: Option<String>,
}

/// What `merge_or_create` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MergeOutcome {
    Created { id: i64 },
    Merged { id: i64, visit_count: i64 },
}

impl MergeOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Created { id } | Self::Merged { id, .. } => *id,
        }
    }

    pub fn visit_count(&self) -> i64 {
        match self {
            Self::Created { .. } => 1,
            Self::Merged { visit_count, .. } => *visit_count,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

// ========== Report Models ==========

/// Spending rolled up under one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// `None` is the uncategorized bucket
    pub category_id: Option<i64>,
    pub category: String,
    pub total: f64,
    pub count: i64,
}

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn next(self) -> Self {
        let index = self.year as i64 * 12 + self.month as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// The month `n` months before this one
    pub fn months_before(self, n: u32) -> Self {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) - n as i64;
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {} (expected YYYY-MM)", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid year in month key: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in month key: {}", s))?;
        Self::new(year, month).ok_or_else(|| format!("Month out of range: {}", s))
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Spending rolled up under one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthTotal {
    pub month: MonthKey,
    pub total: f64,
    pub count: i64,
}
