//! Persisted shape of a journal entry.
//!
//! Plain data with exact decimal strings; sufficient to rebuild the aggregate
//! through [`JournalEntry::reconstruct`](super::entry::JournalEntry::reconstruct).

use chrono::{DateTime, NaiveDate, Utc};
use corebank_shared::types::{CurrencyCode, JournalEntryId, Money, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountCode;
use super::entry::{EntryStatus, JournalEntry};
use super::error::LedgerError;
use super::posting::PostingPair;

/// One stored posting pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingRecord {
    /// Debit account code.
    pub debit_account: String,
    /// Credit account code.
    pub credit_account: String,
    /// Unsigned amount.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Narration.
    #[serde(default)]
    pub description: String,
}

impl PostingRecord {
    /// Parses the stored codes back into a posting pair.
    ///
    /// Amount and self-posting rules are left to the validator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountCode` or `InvalidCurrency` for malformed fields.
    pub fn into_pair(self) -> Result<PostingPair, LedgerError> {
        let debit = AccountCode::new(&self.debit_account)?;
        let credit = AccountCode::new(&self.credit_account)?;
        let currency =
            CurrencyCode::new(&self.currency).map_err(|err| LedgerError::InvalidCurrency(err.0))?;
        Ok(PostingPair::reconstruct(
            debit,
            credit,
            Money::new(self.amount, currency),
            self.description,
        ))
    }
}

impl From<&PostingPair> for PostingRecord {
    fn from(pair: &PostingPair) -> Self {
        Self {
            debit_account: pair.debit_account().code().to_string(),
            credit_account: pair.credit_account().code().to_string(),
            amount: pair.amount(),
            currency: pair.currency().to_string(),
            description: pair.description().to_string(),
        }
    }
}

/// One stored journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntryRecord {
    /// Entry ID.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Effective date.
    pub effective_date: NaiveDate,
    /// Posting pairs, in order.
    pub postings: Vec<PostingRecord>,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Narration.
    #[serde(default)]
    pub description: String,
    /// Caller reference.
    #[serde(default)]
    pub reference: String,
    /// Optimistic-concurrency version.
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

impl JournalEntryRecord {
    /// Returns true if any posting touches `account` on either side.
    #[must_use]
    pub fn touches(&self, account: &AccountCode) -> bool {
        self.postings
            .iter()
            .any(|p| p.debit_account == account.code() || p.credit_account == account.code())
    }
}

impl From<&JournalEntry> for JournalEntryRecord {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: entry.id(),
            tenant_id: entry.tenant_id(),
            effective_date: entry.effective_date(),
            postings: entry.postings().iter().map(PostingRecord::from).collect(),
            status: entry.status(),
            description: entry.description().to_string(),
            reference: entry.reference().to_string(),
            version: entry.version(),
            created_at: entry.created_at(),
            updated_at: entry.updated_at(),
        }
    }
}
