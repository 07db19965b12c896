//! Storage and messaging ports.
//!
//! These traits are implemented by adapter crates. The core only relies on
//! the consistency contract stated on each method.

use std::future::Future;

use chrono::NaiveDate;
use corebank_shared::types::{CurrencyCode, JournalEntryId, PageRequest, TenantId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountCode;
use super::balance::BalanceDelta;
use super::entry::JournalEntry;
use super::events::DomainEvent;
use super::fiscal::{FiscalPeriod, PeriodStatus};

/// Errors reported by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Optimistic-lock failure on a journal entry.
    #[error("version conflict on journal entry {entry_id}: stored {stored}, attempted {attempted}")]
    VersionConflict {
        /// The entry ID.
        entry_id: JournalEntryId,
        /// Version currently stored.
        stored: u64,
        /// Version the writer tried to store.
        attempted: u64,
    },

    /// Backend could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected or failed the operation.
    #[error("storage failure: {0}")]
    Backend(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl RepositoryError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Unavailable(_))
    }
}

/// Inclusive effective-date range; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest effective date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest effective date, inclusive.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Returns true if `date` lies in the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Persistence for journal entries.
pub trait JournalRepository: Send + Sync {
    /// Inserts or replaces an entry together with its postings.
    ///
    /// A stored entry may only be replaced by version `stored + 1`; any other
    /// version fails with `RepositoryError::VersionConflict`.
    fn save(
        &self,
        entry: &JournalEntry,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Loads an entry by ID.
    fn find_by_id(
        &self,
        id: JournalEntryId,
    ) -> impl Future<Output = Result<Option<JournalEntry>, RepositoryError>> + Send;

    /// Lists a tenant's entries touching `account`, newest effective date first.
    ///
    /// Returns the page and the total number of matches.
    fn list_by_account(
        &self,
        tenant_id: TenantId,
        account: &AccountCode,
        range: DateRange,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<JournalEntry>, u64), RepositoryError>> + Send;

    /// Lists a tenant's entries, newest effective date first.
    fn list_by_tenant(
        &self,
        tenant_id: TenantId,
        range: DateRange,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<JournalEntry>, u64), RepositoryError>> + Send;
}

/// Materialized balances.
pub trait BalanceRepository: Send + Sync {
    /// Atomically adds `delta.amount` to the balance of
    /// (`delta.account`, `delta.currency`) from `delta.effective_date` on.
    ///
    /// Must be a commutative increment, never a read-modify-write of a value
    /// read earlier.
    fn update_balance(
        &self,
        delta: &BalanceDelta,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Sum of deltas with effective date `<= as_of`; zero if none.
    fn get_balance(
        &self,
        account: &AccountCode,
        currency: CurrencyCode,
        as_of: NaiveDate,
    ) -> impl Future<Output = Result<Decimal, RepositoryError>> + Send;
}

/// Fiscal period status per tenant.
pub trait FiscalPeriodRepository: Send + Sync {
    /// Status of a period; `Open` when nothing is stored.
    fn get_period_status(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> impl Future<Output = Result<PeriodStatus, RepositoryError>> + Send;

    /// Marks a period closed.
    fn close_period(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Delivery of committed domain events.
///
/// At-least-once; consumers deduplicate on `DomainEvent::event_id`.
pub trait EventPublisher: Send + Sync {
    /// Publishes a batch of events to `topic`.
    fn publish(
        &self,
        topic: &str,
        events: &[DomainEvent],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// One atomic unit of work spanning journal, balances, periods and outbox.
///
/// Nothing written through the transaction is visible to other readers
/// until `commit`. Dropping it without committing discards every write.
pub trait LedgerTransaction:
    JournalRepository + BalanceRepository + FiscalPeriodRepository + Sized
{
    /// Appends events to the outbox, committed with the rest of the unit.
    fn enqueue_events(
        &self,
        topic: &str,
        events: &[DomainEvent],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Applies every staged write atomically.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Discards every staged write.
    fn rollback(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Starts units of work. Also serves committed reads.
pub trait UnitOfWork: JournalRepository + BalanceRepository + FiscalPeriodRepository {
    /// Transaction type handed out by `begin`.
    type Transaction: LedgerTransaction + Send;

    /// Opens a new unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepositoryError>> + Send;
}
