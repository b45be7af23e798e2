//! Access to the fund snapshot database.
//!
//! Generators read data through the [`FundData`] trait, one method per dataset,
//! each returning rows of a named-field struct.  [`postgres::PgDataSource`] is
//! the production implementation; tests supply in-memory ones.

pub mod postgres;
pub mod procedures;

use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;

/// Errors raised while reading from the data source.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The blocking runtime used to drive the driver could not start.
    #[error("failed to start the database runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// No connection could be established.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        /// Database host.
        host: String,
        /// Database port.
        port: u16,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// The statement failed to execute or its rows could not be decoded.
    #[error("query `{query}` failed: {source}")]
    Execute {
        /// Name of the query.
        query: &'static str,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
}

/// Grouping used by the subscription effects report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Breakdown {
    /// Fund category.
    Category,
    /// Fund subcategory.
    Subcategory,
    /// Managing company.
    Manager,
}

impl Breakdown {
    /// Number of decimals the effects are rounded to.
    pub fn decimals(self) -> u32 {
        match self {
            Self::Category | Self::Subcategory => 0,
            Self::Manager => 2,
        }
    }

    /// Whether rows are ordered by the one-day effect descending.
    pub fn descending(self) -> bool {
        matches!(self, Self::Manager)
    }
}

/// A total for one snapshot date.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct DatedTotal {
    /// Snapshot date.
    pub fecha: NaiveDate,
    /// Aggregated value.
    pub total: Decimal,
}

/// Net subscription effects over several horizons, in millions.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct EffectRow {
    /// Category, subcategory or manager name.
    pub label: String,
    /// One day.
    pub es_1d: Decimal,
    /// One week.
    pub es_1w: Decimal,
    /// Month to date.
    pub es_mtd: Decimal,
    /// One month.
    pub es_1m: Decimal,
    /// Three months.
    pub es_3m: Decimal,
    /// Year to date.
    pub es_ytd: Decimal,
    /// One year.
    pub es_1y: Decimal,
}

impl EffectRow {
    /// Horizons in table order.
    pub fn horizons(&self) -> [Decimal; 7] {
        [
            self.es_1d,
            self.es_1w,
            self.es_mtd,
            self.es_1m,
            self.es_3m,
            self.es_ytd,
            self.es_1y,
        ]
    }
}

/// Unit value returns of a fund, as ratios.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct FundReturn {
    /// Fund name.
    pub fondo: String,
    /// Net assets.
    pub patrimonio: Decimal,
    /// Category.
    pub categoria: String,
    /// Subcategory.
    pub sub_categoria: String,
    /// One day.
    pub rent_1d: Option<Decimal>,
    /// Week to date.
    pub rent_wtd: Option<Decimal>,
    /// Month to date.
    pub rent_mtd: Option<Decimal>,
    /// One month.
    pub rent_1m: Option<Decimal>,
    /// Three months.
    pub rent_3m: Option<Decimal>,
    /// Year to date.
    pub rent_ytd: Option<Decimal>,
    /// One year.
    pub rent_1y: Option<Decimal>,
}

impl FundReturn {
    /// Periods in table order.
    pub fn periods(&self) -> [Option<Decimal>; 7] {
        [
            self.rent_1d,
            self.rent_wtd,
            self.rent_mtd,
            self.rent_1m,
            self.rent_3m,
            self.rent_ytd,
            self.rent_1y,
        ]
    }
}

/// A fund missing part of its classification.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct UnclassifiedFund {
    /// Fund name.
    pub fondo: String,
}

/// AUM of a single fund together with its classification.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct FundAum {
    /// Snapshot date.
    pub fecha: NaiveDate,
    /// Fund family.
    pub familia: String,
    /// Category.
    pub categoria: String,
    /// Subcategory.
    pub sub_categoria: String,
    /// Net assets.
    pub patrimonio: Decimal,
    /// Managing company.
    pub gerente: String,
}

/// Read access to the datasets behind the report.
///
/// Rows are returned in the order the report shows them; callers never
/// re-sort.
pub trait FundData {
    /// Most recent snapshot date, if any snapshot exists.
    fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>, QueryError>;

    /// Industry AUM totals up to `date`, newest first.
    fn aum_history(&self, date: NaiveDate, points: u32) -> Result<Vec<DatedTotal>, QueryError>;

    /// Net one-day subscriptions (millions) for the latest dates, newest first.
    fn subscription_history(&self, points: u32) -> Result<Vec<DatedTotal>, QueryError>;

    /// Subscription effects on `date` grouped by `breakdown`.
    fn subscription_effects(
        &self,
        date: NaiveDate,
        breakdown: Breakdown,
    ) -> Result<Vec<EffectRow>, QueryError>;

    /// Per-fund returns on `date`.
    fn fund_returns(&self, date: NaiveDate) -> Result<Vec<FundReturn>, QueryError>;

    /// Funds with incomplete classification.
    fn unclassified_funds(&self) -> Result<Vec<UnclassifiedFund>, QueryError>;

    /// AUM per fund on `date`.
    fn aum_by_fund(&self, date: NaiveDate) -> Result<Vec<FundAum>, QueryError>;

    /// Family AUM totals up to `date`, newest first.
    fn family_aum_history(
        &self,
        date: NaiveDate,
        points: u32,
    ) -> Result<Vec<DatedTotal>, QueryError>;
}

/// Parses a `YYYY-MM-DD` report date.
pub fn parse_report_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Picks the report date from the command line, the data source, or the
/// fallback, in that order.
pub fn resolve_report_date(
    argument: Option<&str>,
    data: &dyn FundData,
    fallback: NaiveDate,
) -> NaiveDate {
    if let Some(raw) = argument {
        match parse_report_date(raw) {
            Some(date) => {
                info!("Using report date from argument: {date}");
                return date;
            }
            None => warn!("Invalid date '{raw}' in argument; using the latest snapshot date"),
        }
    }

    match data.latest_snapshot_date() {
        Ok(Some(date)) => {
            info!("Using report date from database: {date}");
            date
        }
        Ok(None) => {
            warn!("No snapshots found; using fallback report date {fallback}");
            fallback
        }
        Err(err) => {
            warn!("Could not read the latest snapshot date ({err}); using fallback {fallback}");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::NaiveDate;

    use super::{
        parse_report_date, resolve_report_date, Breakdown, DatedTotal, EffectRow, FundAum, FundData,
        FundReturn, QueryError, UnclassifiedFund,
    };

    struct LatestOnly {
        latest: Option<NaiveDate>,
        calls: Cell<usize>,
    }

    impl FundData for LatestOnly {
        fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>, QueryError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.latest)
        }
        fn aum_history(&self, _: NaiveDate, _: u32) -> Result<Vec<DatedTotal>, QueryError> {
            Ok(Vec::new())
        }
        fn subscription_history(&self, _: u32) -> Result<Vec<DatedTotal>, QueryError> {
            Ok(Vec::new())
        }
        fn subscription_effects(&self, _: NaiveDate, _: Breakdown) -> Result<Vec<EffectRow>, QueryError> {
            Ok(Vec::new())
        }
        fn fund_returns(&self, _: NaiveDate) -> Result<Vec<FundReturn>, QueryError> {
            Ok(Vec::new())
        }
        fn unclassified_funds(&self) -> Result<Vec<UnclassifiedFund>, QueryError> {
            Ok(Vec::new())
        }
        fn aum_by_fund(&self, _: NaiveDate) -> Result<Vec<FundAum>, QueryError> {
            Ok(Vec::new())
        }
        fn family_aum_history(&self, _: NaiveDate, _: u32) -> Result<Vec<DatedTotal>, QueryError> {
            Ok(Vec::new())
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn argument_wins_when_valid() {
        let data = LatestOnly { latest: Some(ymd(2025, 4, 1)), calls: Cell::new(0) };
        let date = resolve_report_date(Some("2025-03-13"), &data, ymd(2000, 1, 1));
        assert_eq!(date, ymd(2025, 3, 13));
        assert_eq!(data.calls.get(), 0);
    }

    #[test]
    fn malformed_argument_falls_back_to_latest_snapshot() {
        let data = LatestOnly { latest: Some(ymd(2025, 4, 1)), calls: Cell::new(0) };
        let date = resolve_report_date(Some("13/03/2025"), &data, ymd(2000, 1, 1));
        assert_eq!(date, ymd(2025, 4, 1));
    }

    #[test]
    fn empty_database_uses_fallback() {
        let data = LatestOnly { latest: None, calls: Cell::new(0) };
        assert_eq!(resolve_report_date(None, &data, ymd(2025, 3, 13)), ymd(2025, 3, 13));
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_report_date(" 2025-03-13 "), Some(ymd(2025, 3, 13)));
        assert_eq!(parse_report_date("2025-13-01"), None);
    }

    #[test]
    fn manager_breakdown_uses_two_decimals_descending() {
        assert_eq!(Breakdown::Manager.decimals(), 2);
        assert!(Breakdown::Manager.descending());
        assert!(!Breakdown::Category.descending());
    }
}
