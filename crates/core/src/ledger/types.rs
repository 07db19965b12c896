//! Request types for the ledger use cases.
//!
//! These carry caller strings as received; conversion into validated value
//! objects happens in the service, failing fast on the first bad field.

use chrono::NaiveDate;
use corebank_shared::types::{PageRequest, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountCode;
use super::error::LedgerError;
use super::posting::PostingPair;

/// One requested debit/credit pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingInput {
    /// Account to debit.
    pub debit_account: String,
    /// Account to credit.
    pub credit_account: String,
    /// Amount to move; must be positive.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Optional narration.
    #[serde(default)]
    pub description: String,
}

impl PostingInput {
    /// Converts into a validated posting pair.
    ///
    /// # Errors
    ///
    /// Returns the first account code, self-posting, amount, or currency error.
    pub fn to_pair(&self) -> Result<PostingPair, LedgerError> {
        let debit = AccountCode::new(&self.debit_account)?;
        let credit = AccountCode::new(&self.credit_account)?;
        PostingPair::new(
            debit,
            credit,
            self.amount,
            &self.currency,
            self.description.clone(),
        )
    }
}

/// Request to post a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostJournalEntryInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Date the entry takes effect on balances.
    pub effective_date: NaiveDate,
    /// Posting pairs; at least one, balanced per currency.
    pub postings: Vec<PostingInput>,
    /// Narration.
    #[serde(default)]
    pub description: String,
    /// Caller reference (e.g. a payment ID).
    #[serde(default)]
    pub reference: String,
}

/// Filter for listing journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntriesFilter {
    /// Tenant whose entries to list.
    pub tenant_id: TenantId,
    /// Only entries touching this account code.
    #[serde(default)]
    pub account: Option<String>,
    /// Earliest effective date, inclusive.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Latest effective date, inclusive.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Paging.
    #[serde(flatten)]
    pub page: PageRequest,
}

impl ListEntriesFilter {
    /// All entries of a tenant, first page.
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            account: None,
            from: None,
            to: None,
            page: PageRequest::default(),
        }
    }
}
