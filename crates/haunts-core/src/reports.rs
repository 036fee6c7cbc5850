//! Spend aggregation: category and calendar-month rollups
//!
//! Reports are read-only. Transactions are grouped either by category over an
//! inclusive time window, or by the calendar month they were created in.
//! Month boundaries follow a configurable calendar ([`ReportTimeZone`]).

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Category, CategoryTotal, MonthKey, MonthTotal, Transaction, UNCATEGORIZED};
use crate::store::TransactionStore;

/// Calendar used to decide which month a transaction falls in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReportTimeZone {
    /// The local time zone of the running process
    #[default]
    Local,
    /// A fixed IANA time zone
    Named(Tz),
}

impl ReportTimeZone {
    /// Calendar date of `at`
    pub fn date_of(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => at.with_timezone(&Local).date_naive(),
            Self::Named(tz) => at.with_timezone(tz).date_naive(),
        }
    }

    /// Calendar month containing `at`
    pub fn month_of(&self, at: DateTime<Utc>) -> MonthKey {
        let date = self.date_of(at);
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First instant of `date` in this calendar
    pub fn day_start(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let start = match self {
            Self::Local => first_instant(&Local, date),
            Self::Named(tz) => first_instant(tz, date),
        };
        start.ok_or_else(|| {
            Error::InvalidData(format!("No local time exists on {} in {}", date, self))
        })
    }

    /// First instant of `month` in this calendar
    pub fn month_start(&self, month: MonthKey) -> Result<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(month.year, month.month, 1)
            .ok_or_else(|| Error::InvalidData(format!("Invalid month: {}", month)))?;
        self.day_start(date)
    }
}

/// Earliest existing local time on `date`; midnight may be skipped by a DST change
fn first_instant<Z: TimeZone>(tz: &Z, date: NaiveDate) -> Option<DateTime<Utc>> {
    (0..24).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

impl FromStr for ReportTimeZone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        s.parse::<Tz>()
            .map(Self::Named)
            .map_err(|_| format!("Unknown time zone: {} (use \"local\" or an IANA name)", s))
    }
}

impl fmt::Display for ReportTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Category and monthly rollups over a [`TransactionStore`]
pub struct SpendReports<'a, S: TransactionStore + ?Sized> {
    store: &'a S,
    timezone: ReportTimeZone,
}

impl<'a, S: TransactionStore + ?Sized> SpendReports<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            timezone: ReportTimeZone::default(),
        }
    }

    pub fn with_timezone(store: &'a S, timezone: ReportTimeZone) -> Self {
        Self { store, timezone }
    }

    /// Totals per category for transactions created within `[start, end]`
    ///
    /// Transactions without a category are grouped under [`UNCATEGORIZED`].
    /// Largest total first.
    pub fn aggregate_by_category(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CategoryTotal>> {
        if start > end {
            return Err(Error::Validation(format!(
                "Report window starts after it ends ({} > {})",
                start, end
            )));
        }

        let transactions = self.store.owner_transactions(owner, Some(start), Some(end))?;
        let categories = self.store.owner_categories(owner)?;
        debug!(
            "Aggregating {} transactions by category for {}",
            transactions.len(),
            owner
        );

        Ok(totals_by_category(&transactions, &categories))
    }

    /// Totals per calendar month for the last `months_back` months, ending
    /// with the current one, oldest first
    pub fn aggregate_by_month(
        &self,
        owner: &str,
        months_back: u32,
        category_id: Option<i64>,
    ) -> Result<Vec<MonthTotal>> {
        self.aggregate_by_month_at(owner, months_back, category_id, Utc::now())
    }

    /// [`aggregate_by_month`](Self::aggregate_by_month) evaluated as if the current time were `now`
    pub fn aggregate_by_month_at(
        &self,
        owner: &str,
        months_back: u32,
        category_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthTotal>> {
        if months_back < 1 {
            return Err(Error::Validation(
                "months_back must be at least 1".to_string(),
            ));
        }

        let current = self.timezone.month_of(now);
        let first_month = current.months_before(months_back - 1);
        let start = self.timezone.month_start(first_month)?;
        let end = self.timezone.month_start(current.next())? - Duration::milliseconds(1);

        let transactions = self.store.owner_transactions(owner, Some(start), Some(end))?;
        let selected: Vec<Transaction> = match category_id {
            Some(id) => transactions
                .into_iter()
                .filter(|tx| tx.category_id == Some(id))
                .collect(),
            None => transactions,
        };
        debug!(
            "Aggregating {} transactions by month since {} ({})",
            selected.len(),
            first_month,
            self.timezone
        );

        Ok(totals_by_month(&selected, self.timezone))
    }
}

/// Group transactions by category, labelling each group by category name
pub fn totals_by_category(transactions: &[Transaction], categories: &[Category]) -> Vec<CategoryTotal> {
    let names: HashMap<i64, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut groups: HashMap<Option<i64>, (f64, i64)> = HashMap::new();
    for tx in transactions {
        let entry = groups.entry(tx.category_id).or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category_id, (total, count))| {
            let category = match category_id {
                None => UNCATEGORIZED.to_string(),
                Some(id) => names
                    .get(&id)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("Category {}", id)),
            };
            CategoryTotal {
                category_id,
                category,
                total,
                count,
            }
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    totals
}

/// Group transactions by the calendar month of their creation time, oldest first
pub fn totals_by_month(transactions: &[Transaction], timezone: ReportTimeZone) -> Vec<MonthTotal> {
    let mut groups: BTreeMap<MonthKey, (f64, i64)> = BTreeMap::new();
    for tx in transactions {
        let entry = groups
            .entry(timezone.month_of(tx.created_at))
            .or_insert((0.0, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(month, (total, count))| MonthTotal {
            month,
            total,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewTransaction;

    const UTC_CALENDAR: ReportTimeZone = ReportTimeZone::Named(Tz::UTC);

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn spend(db: &Database, amount: f64, category_id: Option<i64>, created_at: DateTime<Utc>) {
        db.insert_transaction(&NewTransaction {
            category_id,
            created_at: Some(created_at),
            ..NewTransaction::spend("me", amount)
        })
        .unwrap();
    }

    fn tx(amount: f64, category_id: Option<i64>, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: 0,
            owner: "me".to_string(),
            amount,
            category_id,
            name: None,
            latitude: None,
            longitude: None,
            source: Default::default(),
            created_at,
        }
    }

    #[test]
    fn test_category_rollup_scenario() {
        let db = Database::in_memory().unwrap();
        let a = db.create_category("me", "A").unwrap();
        let day = at(2024, 5, 10, 12);

        spend(&db, 10.0, Some(a), day);
        spend(&db, 20.0, Some(a), day + Duration::hours(1));
        spend(&db, 5.0, None, day + Duration::hours(2));
        // Outside the window, and someone else's
        spend(&db, 99.0, Some(a), day - Duration::days(30));
        db.insert_transaction(&NewTransaction {
            created_at: Some(day),
            ..NewTransaction::spend("you", 50.0)
        })
        .unwrap();

        let reports = SpendReports::with_timezone(&db, UTC_CALENDAR);
        let totals = reports
            .aggregate_by_category("me", at(2024, 5, 1, 0), at(2024, 5, 31, 23))
            .unwrap();

        assert_eq!(
            totals,
            vec![
                CategoryTotal {
                    category_id: Some(a),
                    category: "A".to_string(),
                    total: 30.0,
                    count: 2,
                },
                CategoryTotal {
                    category_id: None,
                    category: UNCATEGORIZED.to_string(),
                    total: 5.0,
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_category_window_is_inclusive() {
        let db = Database::in_memory().unwrap();
        let start = at(2024, 1, 1, 0);
        let end = at(2024, 1, 31, 0);
        spend(&db, 1.0, None, start);
        spend(&db, 2.0, None, end);
        spend(&db, 4.0, None, end + Duration::milliseconds(1));

        let totals = SpendReports::new(&db)
            .aggregate_by_category("me", start, end)
            .unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total, 3.0);
        assert_eq!(totals[0].count, 2);
    }

    #[test]
    fn test_category_window_validated() {
        let db = Database::in_memory().unwrap();
        let err = SpendReports::new(&db)
            .aggregate_by_category("me", at(2024, 2, 1, 0), at(2024, 1, 1, 0))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_monthly_rollup() {
        let db = Database::in_memory().unwrap();
        let a = db.create_category("me", "A").unwrap();
        spend(&db, 100.0, None, at(2024, 1, 20, 0));
        spend(&db, 10.0, None, at(2024, 2, 3, 0));
        spend(&db, 5.0, Some(a), at(2024, 2, 20, 0));
        spend(&db, 7.0, None, at(2024, 3, 1, 0));

        let reports = SpendReports::with_timezone(&db, UTC_CALENDAR);
        let now = at(2024, 3, 15, 12);

        let months = reports.aggregate_by_month_at("me", 2, None, now).unwrap();
        assert_eq!(
            months,
            vec![
                MonthTotal {
                    month: MonthKey::new(2024, 2).unwrap(),
                    total: 15.0,
                    count: 2,
                },
                MonthTotal {
                    month: MonthKey::new(2024, 3).unwrap(),
                    total: 7.0,
                    count: 1,
                },
            ]
        );

        let filtered = reports.aggregate_by_month_at("me", 2, Some(a), now).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].total, 5.0);

        let current = reports.aggregate_by_month_at("me", 1, None, now).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].month, MonthKey::new(2024, 3).unwrap());

        assert!(matches!(
            reports.aggregate_by_month_at("me", 0, None, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_monthly_rollup_stops_at_current_month() {
        let db = Database::in_memory().unwrap();
        spend(&db, 8.0, None, at(2024, 3, 15, 0));
        spend(&db, 50.0, None, at(2024, 4, 2, 0));
        spend(&db, 60.0, None, at(2025, 1, 1, 0));

        let reports = SpendReports::with_timezone(&db, UTC_CALENDAR);
        let now = at(2024, 3, 15, 12);

        let current = reports.aggregate_by_month_at("me", 1, None, now).unwrap();
        assert_eq!(
            current,
            vec![MonthTotal {
                month: MonthKey::new(2024, 3).unwrap(),
                total: 8.0,
                count: 1,
            }]
        );

        // Last millisecond of the current month still counts
        spend(&db, 1.0, None, at(2024, 4, 1, 0) - Duration::milliseconds(1));
        let current = reports.aggregate_by_month_at("me", 3, None, now).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].total, 9.0);
    }

    #[test]
    fn test_monthly_window_crosses_year() {
        let db = Database::in_memory().unwrap();
        spend(&db, 3.0, None, at(2023, 11, 30, 23));
        spend(&db, 4.0, None, at(2023, 12, 1, 0));

        let months = SpendReports::with_timezone(&db, UTC_CALENDAR)
            .aggregate_by_month_at("me", 2, None, at(2024, 1, 5, 0))
            .unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].month, MonthKey::new(2023, 12).unwrap());
    }

    #[test]
    fn test_named_timezone_bucketing() {
        let hong_kong = ReportTimeZone::Named(chrono_tz::Asia::Hong_Kong);
        // 04:00 on Feb 1 in Hong Kong
        let late_january_utc = at(2024, 1, 31, 20);

        assert_eq!(
            hong_kong.month_of(late_january_utc),
            MonthKey::new(2024, 2).unwrap()
        );
        assert_eq!(
            UTC_CALENDAR.month_of(late_january_utc),
            MonthKey::new(2024, 1).unwrap()
        );
        assert_eq!(
            hong_kong
                .month_start(MonthKey::new(2024, 2).unwrap())
                .unwrap(),
            at(2024, 1, 31, 16)
        );
        assert_eq!(
            hong_kong.date_of(late_january_utc),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(
            hong_kong
                .day_start(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
                .unwrap(),
            at(2024, 3, 9, 16)
        );

        let months = totals_by_month(&[tx(8.0, None, late_january_utc)], hong_kong);
        assert_eq!(months[0].month, MonthKey::new(2024, 2).unwrap());
    }

    #[test]
    fn test_unknown_category_label() {
        let totals = totals_by_category(&[tx(2.0, Some(42), at(2024, 1, 1, 0))], &[]);
        assert_eq!(totals[0].category, "Category 42");
    }

    #[test]
    fn test_report_timezone_parse() {
        assert_eq!("local".parse::<ReportTimeZone>().unwrap(), ReportTimeZone::Local);
        assert_eq!("LOCAL".parse::<ReportTimeZone>().unwrap(), ReportTimeZone::Local);
        assert_eq!(
            "Europe/Paris".parse::<ReportTimeZone>().unwrap(),
            ReportTimeZone::Named(chrono_tz::Europe::Paris)
        );
        assert!("Nowhere/Special".parse::<ReportTimeZone>().is_err());
        assert_eq!(ReportTimeZone::Named(chrono_tz::Europe::Paris).to_string(), "Europe/Paris");
    }

    #[test]
    fn test_category_totals_sum_to_grand_total() {
        let base = at(2024, 6, 1, 0);
        let transactions: Vec<Transaction> = (0..60i64)
            .map(|i| {
                let amount = 0.01 + (i * 37 % 1_000) as f64 * 9.99;
                let category = if i % 7 == 0 { None } else { Some(i % 5) };
                tx(amount, category, base + Duration::minutes(i))
            })
            .collect();

        let totals = totals_by_category(&transactions, &[]);
        let grand: f64 = transactions.iter().map(|t| t.amount).sum();
        let summed: f64 = totals.iter().map(|t| t.total).sum();
        let count: i64 = totals.iter().map(|t| t.count).sum();

        assert!((grand - summed).abs() <= 1e-6 * grand);
        assert_eq!(count, transactions.len() as i64);
        assert_eq!(totals.len(), 6);
    }
}
