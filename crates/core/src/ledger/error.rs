//! Ledger error types for validation, state, and infrastructure failures.
//!
//! Validation and state errors are always raised before any write.
//! Infrastructure errors abort the unit of work they occur in.

use chrono::NaiveDate;
use corebank_shared::AppError;
use corebank_shared::types::{CurrencyCode, JournalEntryId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountCode;
use super::entry::EntryStatus;
use super::fiscal::FiscalPeriod;
use super::ports::RepositoryError;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input is malformed or violates a posting rule.
    Validation,
    /// Input is well-formed but conflicts with current ledger state.
    State,
    /// A repository failed.
    Infrastructure,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Account code does not match the chart-of-accounts pattern.
    #[error("Invalid account code: {0:?}")]
    InvalidAccountCode(String),

    /// A posting pair debits and credits the same account.
    #[error("Debit and credit account must differ, got {0} on both sides")]
    SelfPosting(AccountCode),

    /// Posting amount is zero or negative.
    #[error("Posting amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Currency is not a well-formed ISO 4217 code.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Journal entry has no postings.
    #[error("Journal entry must have at least one posting")]
    EmptyPostings,

    /// Debits and credits differ in one currency.
    #[error("Journal entry is not balanced in {currency}. Debit: {debits}, Credit: {credits}")]
    UnbalancedEntry {
        /// The currency that does not balance.
        currency: CurrencyCode,
        /// Total debits in that currency.
        debits: Decimal,
        /// Total credits in that currency.
        credits: Decimal,
    },

    /// Leg totals in one currency exceed the representable decimal range.
    #[error("Posting totals overflow in {currency}")]
    AmountOverflow {
        /// The currency whose totals overflowed.
        currency: CurrencyCode,
    },

    /// Year or month outside the supported range.
    #[error("Invalid fiscal period: year {year}, month {month}")]
    InvalidFiscalPeriod {
        /// Requested year.
        year: i32,
        /// Requested month.
        month: u32,
    },

    /// Backvalue target date is after today.
    #[error("Cannot backvalue to {requested}: date is after {today}")]
    BackvalueInFuture {
        /// Requested effective date.
        requested: NaiveDate,
        /// Today's date when the request was made.
        today: NaiveDate,
    },

    /// Tenant identifier is missing (nil).
    #[error("Tenant is required")]
    MissingTenant,

    // ========== State Errors ==========
    /// Entry has already been posted.
    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(JournalEntryId),

    /// Operation not permitted from the entry's current status.
    #[error("Cannot {action} a journal entry in status {from}")]
    InvalidStatusTransition {
        /// Current status.
        from: EntryStatus,
        /// Attempted operation.
        action: &'static str,
    },

    /// Period is already closed.
    #[error("Fiscal period {0} is already closed")]
    PeriodAlreadyClosed(FiscalPeriod),

    /// Period is closed, no posting allowed.
    #[error("Fiscal period {0} is closed, no posting allowed")]
    PeriodClosed(FiscalPeriod),

    /// Entry does not exist.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Entry was modified concurrently.
    #[error("Journal entry {entry_id} was modified concurrently (stored version {stored}, attempted {attempted})")]
    VersionConflict {
        /// The entry ID.
        entry_id: JournalEntryId,
        /// Version currently stored.
        stored: u64,
        /// Version the writer tried to store.
        attempted: u64,
    },

    // ========== Infrastructure Errors ==========
    /// A repository call failed.
    #[error("Repository error during {operation}: {source}")]
    Repository {
        /// The operation that failed.
        operation: &'static str,
        /// Underlying repository error.
        #[source]
        source: RepositoryError,
    },
}

impl LedgerError {
    /// Wraps a repository error, lifting optimistic-lock failures into
    /// `VersionConflict`.
    #[must_use]
    pub fn repository(operation: &'static str, source: RepositoryError) -> Self {
        match source {
            RepositoryError::VersionConflict {
                entry_id,
                stored,
                attempted,
            } => Self::VersionConflict {
                entry_id,
                stored,
                attempted,
            },
            source => Self::Repository { operation, source },
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAccountCode(_)
            | Self::SelfPosting(_)
            | Self::NonPositiveAmount(_)
            | Self::InvalidCurrency(_)
            | Self::EmptyPostings
            | Self::UnbalancedEntry { .. }
            | Self::AmountOverflow { .. }
            | Self::InvalidFiscalPeriod { .. }
            | Self::BackvalueInFuture { .. }
            | Self::MissingTenant => ErrorKind::Validation,

            Self::AlreadyPosted(_)
            | Self::InvalidStatusTransition { .. }
            | Self::PeriodAlreadyClosed(_)
            | Self::PeriodClosed(_)
            | Self::EntryNotFound(_)
            | Self::VersionConflict { .. } => ErrorKind::State,

            Self::Repository { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAccountCode(_) => "INVALID_ACCOUNT_CODE",
            Self::SelfPosting(_) => "SELF_POSTING",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::EmptyPostings => "EMPTY_POSTINGS",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::InvalidFiscalPeriod { .. } => "INVALID_FISCAL_PERIOD",
            Self::BackvalueInFuture { .. } => "BACKVALUE_IN_FUTURE",
            Self::MissingTenant => "MISSING_TENANT",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::PeriodAlreadyClosed(_) => "PERIOD_ALREADY_CLOSED",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::VersionConflict { .. } => "VERSION_CONFLICT",
            Self::Repository { .. } => "REPOSITORY_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::EntryNotFound(_) => 404,
            _ => match self.kind() {
                ErrorKind::Validation => 400,
                ErrorKind::State => 409,
                ErrorKind::Infrastructure => 500,
            },
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::VersionConflict { .. } => true,
            Self::Repository { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err.kind() {
            ErrorKind::Validation => Self::Validation(err.to_string()),
            ErrorKind::State if matches!(err, LedgerError::EntryNotFound(_)) => {
                Self::NotFound(err.to_string())
            }
            ErrorKind::State => Self::Conflict(err.to_string()),
            ErrorKind::Infrastructure if err.is_retryable() => {
                Self::Unavailable(err.error_code().to_string())
            }
            ErrorKind::Infrastructure => Self::Internal(err.error_code().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn period() -> FiscalPeriod {
        FiscalPeriod::new(2024, 1).unwrap()
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::EmptyPostings.error_code(), "EMPTY_POSTINGS");
        assert_eq!(
            LedgerError::UnbalancedEntry {
                currency: usd(),
                debits: dec!(100.00),
                credits: dec!(50.00),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::PeriodAlreadyClosed(period()).error_code(),
            "PERIOD_ALREADY_CLOSED"
        );
        assert_eq!(
            LedgerError::AlreadyPosted(JournalEntryId::new()).error_code(),
            "ALREADY_POSTED"
        );

        let overflow = LedgerError::AmountOverflow { currency: usd() };
        assert_eq!(overflow.error_code(), "AMOUNT_OVERFLOW");
        assert_eq!(overflow.kind(), ErrorKind::Validation);
        assert_eq!(overflow.http_status_code(), 400);
    }

    #[test]
    fn test_kinds_and_http_status_codes() {
        let validation = LedgerError::InvalidAccountCode("x".into());
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(validation.http_status_code(), 400);

        let state = LedgerError::PeriodClosed(period());
        assert_eq!(state.kind(), ErrorKind::State);
        assert_eq!(state.http_status_code(), 409);

        assert_eq!(
            LedgerError::EntryNotFound(JournalEntryId::new()).http_status_code(),
            404
        );

        let infra = LedgerError::repository(
            "save journal entry",
            RepositoryError::Unavailable("connection reset".into()),
        );
        assert_eq!(infra.kind(), ErrorKind::Infrastructure);
        assert_eq!(infra.http_status_code(), 500);
    }

    #[test]
    fn test_repository_version_conflict_is_lifted() {
        let entry_id = JournalEntryId::new();
        let err = LedgerError::repository(
            "save journal entry",
            RepositoryError::VersionConflict {
                entry_id,
                stored: 2,
                attempted: 2,
            },
        );
        assert!(matches!(err, LedgerError::VersionConflict { stored: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::VersionConflict {
            entry_id: JournalEntryId::new(),
            stored: 1,
            attempted: 3,
        }
        .is_retryable());
        assert!(LedgerError::repository("get balance", RepositoryError::Unavailable(String::new()))
            .is_retryable());
        assert!(!LedgerError::repository("find entry", RepositoryError::Corrupt(String::new()))
            .is_retryable());
        let backend = LedgerError::repository("commit posting", RepositoryError::Backend(String::new()));
        assert!(!backend.is_retryable());
        assert!(matches!(AppError::from(backend), AppError::Internal(_)));
        assert!(!LedgerError::EmptyPostings.is_retryable());
        assert!(!LedgerError::PeriodClosed(period()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::UnbalancedEntry {
            currency: usd(),
            debits: dec!(100.00),
            credits: dec!(50.00),
        };
        assert_eq!(
            err.to_string(),
            "Journal entry is not balanced in USD. Debit: 100.00, Credit: 50.00"
        );
        assert_eq!(
            LedgerError::PeriodClosed(period()).to_string(),
            "Fiscal period 2024-01 is closed, no posting allowed"
        );
        assert_eq!(
            LedgerError::InvalidStatusTransition {
                from: EntryStatus::Posted,
                action: "backvalue",
            }
            .to_string(),
            "Cannot backvalue a journal entry in status POSTED"
        );
    }

    #[test]
    fn test_app_error_hides_infrastructure_detail() {
        let app: AppError = LedgerError::repository(
            "update balance",
            RepositoryError::Unavailable("10.0.0.7:5432 refused".into()),
        )
        .into();
        assert_eq!(app.status_code(), 503);
        assert!(!app.to_string().contains("10.0.0.7"));

        let app: AppError = LedgerError::EntryNotFound(JournalEntryId::new()).into();
        assert_eq!(app.error_code(), "NOT_FOUND");

        let app: AppError = LedgerError::EmptyPostings.into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
    }
}
