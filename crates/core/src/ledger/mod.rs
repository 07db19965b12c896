//! Double-entry posting engine.
//!
//! This module implements the ledger core:
//! - Account codes and posting pairs (value objects)
//! - The journal entry aggregate and its state machine
//! - Posting validation (per-currency balance law)
//! - Balance deltas and as-of balances
//! - Fiscal period gating
//! - Nostro reconciliation against external statements
//! - Ports for storage, units of work, and event publication
//! - The ledger service orchestrating the posting workflow

pub mod account;
pub mod balance;
pub mod entry;
pub mod error;
pub mod events;
pub mod fiscal;
pub mod ports;
pub mod posting;
pub mod reconciliation;
pub mod record;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod entry_props;
#[cfg(test)]
mod validation_props;

pub use account::AccountCode;
pub use balance::{Balance, BalanceDelta, TrialBalance, deltas_for};
pub use entry::{EntryStatus, JournalEntry};
pub use error::{ErrorKind, LedgerError};
pub use events::{DomainEvent, LedgerEvent};
pub use fiscal::{FiscalPeriod, PeriodStatus};
pub use ports::{
    BalanceRepository, DateRange, EventPublisher, FiscalPeriodRepository, JournalRepository,
    LedgerTransaction, RepositoryError, UnitOfWork,
};
pub use posting::{Leg, PostingPair, Side};
pub use reconciliation::{
    InternalLine, NostroReconciliation, ReconciliationResult, ReconciliationStatus,
    ReconciliationSummary, StatementLine,
};
pub use record::{JournalEntryRecord, PostingRecord};
pub use service::LedgerService;
pub use types::{ListEntriesFilter, PostJournalEntryInput, PostingInput};
pub use validation::PostingValidator;
