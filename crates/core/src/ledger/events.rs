//! Domain events raised by the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use corebank_shared::types::{EventId, JournalEntryId, TenantId};
use serde::{Deserialize, Serialize};

use super::fiscal::FiscalPeriod;
use super::record::PostingRecord;

/// Aggregate type tag for journal entry events.
pub const JOURNAL_ENTRY_AGGREGATE: &str = "JournalEntry";
/// Aggregate type tag for fiscal period events.
pub const FISCAL_PERIOD_AGGREGATE: &str = "FiscalPeriod";

/// Event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// An entry moved from PENDING to POSTED.
    JournalEntryPosted {
        /// The posted entry.
        entry_id: JournalEntryId,
        /// Effective date at posting time.
        effective_date: NaiveDate,
        /// Posting pairs, in order.
        postings: Vec<PostingRecord>,
    },
    /// An entry was re-dated.
    JournalEntryBackvalued {
        /// The re-dated entry.
        entry_id: JournalEntryId,
        /// Effective date before the change.
        previous_date: NaiveDate,
        /// Effective date after the change.
        effective_date: NaiveDate,
    },
    /// A fiscal period was closed.
    PeriodClosed {
        /// The closed period.
        period: FiscalPeriod,
    },
}

impl LedgerEvent {
    /// Stable event type name used for routing.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::JournalEntryPosted { .. } => "ledger.entry.posted",
            Self::JournalEntryBackvalued { .. } => "ledger.entry.backvalued",
            Self::PeriodClosed { .. } => "ledger.period.closed",
        }
    }

    /// Aggregate type the event belongs to.
    #[must_use]
    pub const fn aggregate_type(&self) -> &'static str {
        match self {
            Self::JournalEntryPosted { .. } | Self::JournalEntryBackvalued { .. } => {
                JOURNAL_ENTRY_AGGREGATE
            }
            Self::PeriodClosed { .. } => FISCAL_PERIOD_AGGREGATE,
        }
    }
}

/// Envelope carried through the outbox to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID; consumers deduplicate on it.
    pub event_id: EventId,
    /// Tenant the event belongs to.
    pub tenant_id: TenantId,
    /// Aggregate version after the change (1 for period events).
    pub aggregate_version: u64,
    /// When the change happened.
    pub occurred_at: DateTime<Utc>,
    /// Event payload.
    pub payload: LedgerEvent,
}

impl DomainEvent {
    /// Wraps a payload in a fresh envelope.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        aggregate_version: u64,
        occurred_at: DateTime<Utc>,
        payload: LedgerEvent,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            tenant_id,
            aggregate_version,
            occurred_at,
            payload,
        }
    }

    /// Builds the event for a closed period.
    #[must_use]
    pub fn period_closed(tenant_id: TenantId, period: FiscalPeriod, occurred_at: DateTime<Utc>) -> Self {
        Self::new(tenant_id, 1, occurred_at, LedgerEvent::PeriodClosed { period })
    }

    /// Stable event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    /// Aggregate type name.
    #[must_use]
    pub const fn aggregate_type(&self) -> &'static str {
        self.payload.aggregate_type()
    }

    /// Aggregate ID as a string: the entry ID, or `{tenant}:{YYYY-MM}` for periods.
    #[must_use]
    pub fn aggregate_id(&self) -> String {
        match &self.payload {
            LedgerEvent::JournalEntryPosted { entry_id, .. }
            | LedgerEvent::JournalEntryBackvalued { entry_id, .. } => entry_id.to_string(),
            LedgerEvent::PeriodClosed { period } => format!("{}:{period}", self.tenant_id),
        }
    }
}
