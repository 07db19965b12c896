//! Journal entry aggregate.
//!
//! A `JournalEntry` is an immutable value: every transition returns a new
//! entry with the version bumped and exactly one event appended to its
//! pending events. The aggregate never publishes; the caller drains the
//! events after persisting.

use chrono::{DateTime, NaiveDate, Utc};
use corebank_shared::types::{JournalEntryId, TenantId};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::events::{DomainEvent, LedgerEvent};
use super::posting::PostingPair;
use super::record::{JournalEntryRecord, PostingRecord};
use super::validation::PostingValidator;

/// Lifecycle status of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    /// Created and validated, not yet applied to balances.
    Pending,
    /// Applied to balances; postings are frozen.
    Posted,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Posted => write!(f, "POSTED"),
        }
    }
}

/// A versioned, balanced set of posting pairs for one tenant and date.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    id: JournalEntryId,
    tenant_id: TenantId,
    effective_date: NaiveDate,
    postings: Vec<PostingPair>,
    status: EntryStatus,
    description: String,
    reference: String,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pending_events: Vec<DomainEvent>,
}

impl JournalEntry {
    /// Creates a pending entry at version 1 with no pending events.
    ///
    /// # Errors
    ///
    /// Returns the validator's error verbatim (`EmptyPostings`,
    /// `UnbalancedEntry`, ...) or `MissingTenant` for a nil tenant.
    pub fn new(
        tenant_id: TenantId,
        effective_date: NaiveDate,
        postings: Vec<PostingPair>,
        description: impl Into<String>,
        reference: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if tenant_id.into_inner().is_nil() {
            return Err(LedgerError::MissingTenant);
        }
        PostingValidator::validate_postings(&postings)?;

        Ok(Self {
            id: JournalEntryId::new(),
            tenant_id,
            effective_date,
            postings,
            status: EntryStatus::Pending,
            description: description.into(),
            reference: reference.into(),
            version: 1,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        })
    }

    /// Rebuilds an entry from its persisted shape.
    ///
    /// Postings are re-validated; the result carries no pending events.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stored data is malformed.
    pub fn reconstruct(record: JournalEntryRecord) -> Result<Self, LedgerError> {
        let postings = record
            .postings
            .into_iter()
            .map(PostingRecord::into_pair)
            .collect::<Result<Vec<_>, _>>()?;
        PostingValidator::validate_postings(&postings)?;
        PostingValidator::validate_not_self_posting(&postings)?;

        Ok(Self {
            id: record.id,
            tenant_id: record.tenant_id,
            effective_date: record.effective_date,
            postings,
            status: record.status,
            description: record.description,
            reference: record.reference,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
            pending_events: Vec::new(),
        })
    }

    /// Transitions PENDING to POSTED.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` if the entry is not pending.
    pub fn post(&self, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        if self.status != EntryStatus::Pending {
            return Err(LedgerError::AlreadyPosted(self.id));
        }

        let mut next = self.clone();
        next.status = EntryStatus::Posted;
        next.bump(now);
        next.record(
            now,
            LedgerEvent::JournalEntryPosted {
                entry_id: self.id,
                effective_date: self.effective_date,
                postings: self.postings.iter().map(PostingRecord::from).collect(),
            },
        );
        Ok(next)
    }

    /// Moves the entry to a new effective date, keeping its status and postings.
    ///
    /// Whether a posted entry may be backvalued is the caller's policy.
    ///
    /// # Errors
    ///
    /// Returns `BackvalueInFuture` if `new_date` is after `now`'s date.
    pub fn backvalue(&self, new_date: NaiveDate, now: DateTime<Utc>) -> Result<Self, LedgerError> {
        let today = now.date_naive();
        if new_date > today {
            return Err(LedgerError::BackvalueInFuture {
                requested: new_date,
                today,
            });
        }

        let mut next = self.clone();
        next.effective_date = new_date;
        next.bump(now);
        next.record(
            now,
            LedgerEvent::JournalEntryBackvalued {
                entry_id: self.id,
                previous_date: self.effective_date,
                effective_date: new_date,
            },
        );
        Ok(next)
    }

    fn bump(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    fn record(&mut self, now: DateTime<Utc>, payload: LedgerEvent) {
        self.pending_events
            .push(DomainEvent::new(self.tenant_id, self.version, now, payload));
    }

    /// Entry ID.
    #[must_use]
    pub fn id(&self) -> JournalEntryId {
        self.id
    }

    /// Owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Date the entry takes effect on balances.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    /// Posting pairs in their original order.
    #[must_use]
    pub fn postings(&self) -> &[PostingPair] {
        &self.postings
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Free-text narration.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Caller-supplied reference (e.g. the payment ID).
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Optimistic-concurrency version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last transition.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the entry has been posted.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.status == EntryStatus::Posted
    }

    /// Copy of the events raised since the entry was loaded or created.
    #[must_use]
    pub fn domain_events(&self) -> Vec<DomainEvent> {
        self.pending_events.clone()
    }

    /// Splits off the pending events, returning an entry with none left.
    #[must_use]
    pub fn take_domain_events(self) -> (Self, Vec<DomainEvent>) {
        let mut entry = self;
        let events = std::mem::take(&mut entry.pending_events);
        (entry, events)
    }
}
