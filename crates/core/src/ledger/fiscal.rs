//! Fiscal periods and their open/closed status.
//!
//! A fiscal period is one calendar month per tenant. Periods without a stored
//! status are OPEN; closing is one-directional.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Earliest supported fiscal year.
pub const MIN_YEAR: i32 = 2000;
/// Latest supported fiscal year.
pub const MAX_YEAR: i32 = 2100;

/// A calendar-month accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalPeriod {
    year: i32,
    month: u32,
}

impl FiscalPeriod {
    /// Builds a period from a year and a 1-based month.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFiscalPeriod` if the year is outside 2000..=2100 or the
    /// month is outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, LedgerError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidFiscalPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// The period a date falls in.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-based.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the period.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the period.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.next().start_date().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// Returns true if `date` falls inside this period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    /// The following month.
    #[must_use]
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl std::fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for FiscalPeriod {
    type Err = LedgerError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidFiscalPeriod { year: 0, month: 0 };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// Posting status of a fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeriodStatus {
    /// Entries may be posted.
    #[default]
    Open,
    /// No new entries may be posted into the period.
    Closed,
}

impl PeriodStatus {
    /// Returns true if posting is allowed.
    #[must_use]
    pub const fn allows_posting(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Fails with `PeriodClosed` unless the period is open.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PeriodClosed` for a closed period.
    pub fn ensure_open(self, period: FiscalPeriod) -> Result<(), LedgerError> {
        if self.allows_posting() {
            Ok(())
        } else {
            Err(LedgerError::PeriodClosed(period))
        }
    }
}

impl std::fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(1999, 1)]
    #[case(2101, 1)]
    #[case(2024, 0)]
    #[case(2024, 13)]
    fn test_rejects_out_of_range(#[case] year: i32, #[case] month: u32) {
        assert!(matches!(
            FiscalPeriod::new(year, month),
            Err(LedgerError::InvalidFiscalPeriod { .. })
        ));
    }

    #[rstest]
    #[case(2024, 1, date(2024, 1, 31))]
    #[case(2024, 2, date(2024, 2, 29))]
    #[case(2023, 2, date(2023, 2, 28))]
    #[case(2024, 12, date(2024, 12, 31))]
    fn test_end_date(#[case] year: i32, #[case] month: u32, #[case] expected: NaiveDate) {
        let period = FiscalPeriod::new(year, month).unwrap();
        assert_eq!(period.start_date(), date(year, month, 1));
        assert_eq!(period.end_date(), expected);
    }

    #[test]
    fn test_containing_and_contains() {
        let period = FiscalPeriod::containing(date(2024, 3, 15));
        assert_eq!(period, FiscalPeriod::new(2024, 3).unwrap());
        assert!(period.contains(date(2024, 3, 1)));
        assert!(period.contains(date(2024, 3, 31)));
        assert!(!period.contains(date(2024, 4, 1)));
        assert!(!period.contains(date(2023, 3, 15)));
    }

    #[test]
    fn test_next_and_previous_wrap_years() {
        let dec = FiscalPeriod::new(2024, 12).unwrap();
        assert_eq!(dec.next(), FiscalPeriod::new(2025, 1).unwrap());
        assert_eq!(dec.next().previous(), dec);

        let jan = FiscalPeriod::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), FiscalPeriod::new(2023, 12).unwrap());
    }

    #[test]
    fn test_display_and_parse() {
        let period = FiscalPeriod::new(2024, 3).unwrap();
        assert_eq!(period.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<FiscalPeriod>().unwrap(), period);
        assert!("2024/03".parse::<FiscalPeriod>().is_err());
        assert!("2024-13".parse::<FiscalPeriod>().is_err());
    }

    #[test]
    fn test_status_gating() {
        let period = FiscalPeriod::new(2024, 1).unwrap();
        assert_eq!(PeriodStatus::default(), PeriodStatus::Open);
        assert!(PeriodStatus::Open.ensure_open(period).is_ok());
        assert!(matches!(
            PeriodStatus::Closed.ensure_open(period),
            Err(LedgerError::PeriodClosed(p)) if p == period
        ));
    }
}
