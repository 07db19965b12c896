//! Nostro reconciliation.
//!
//! Compares the lines of an external bank statement for one nostro account
//! against the ledger's own legs on that account. Matching is by reference
//! and direction; amounts decide between an exact match and a mismatch.

use std::collections::HashMap;

use chrono::NaiveDate;
use corebank_shared::types::{CurrencyCode, JournalEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountCode;
use super::entry::JournalEntry;
use super::error::LedgerError;
use super::posting::Side;

/// Outcome for one statement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    /// Reference, direction and amount all agree.
    Matched,
    /// Reference and direction agree, amount differs.
    AmountMismatch,
    /// No unmatched ledger leg carries the reference and direction.
    MissingLocal,
}

/// One line of an external statement (e.g. parsed from an MT950).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Reference shared with the ledger entry.
    pub reference: String,
    /// Value date reported by the correspondent.
    pub value_date: NaiveDate,
    /// Direction as seen from our nostro account.
    pub side: Side,
    /// Unsigned amount.
    pub amount: Decimal,
    /// Free-text details.
    #[serde(default)]
    pub details: String,
}

/// A ledger leg on the nostro account, as used for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalLine {
    /// Journal entry the leg belongs to.
    pub entry_id: JournalEntryId,
    /// Entry reference.
    pub reference: String,
    /// Entry effective date.
    pub value_date: NaiveDate,
    /// Debit or credit on the nostro account.
    pub side: Side,
    /// Unsigned amount.
    pub amount: Decimal,
    /// Pair description, falling back to the entry description.
    pub description: String,
}

impl InternalLine {
    /// Legs of `entry` that move `account` in `currency`.
    #[must_use]
    pub fn from_entry(
        entry: &JournalEntry,
        account: &AccountCode,
        currency: CurrencyCode,
    ) -> Vec<Self> {
        entry
            .postings()
            .iter()
            .flat_map(move |pair| {
                let description = if pair.description().is_empty() {
                    entry.description()
                } else {
                    pair.description()
                };
                pair.legs()
                    .into_iter()
                    .filter(move |leg| &leg.account == account && leg.currency == currency)
                    .map(move |leg| Self {
                        entry_id: entry.id(),
                        reference: entry.reference().to_string(),
                        value_date: entry.effective_date(),
                        side: leg.side,
                        amount: leg.amount,
                        description: description.to_string(),
                    })
            })
            .collect()
    }
}

/// Result for one statement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// The statement line.
    pub external: StatementLine,
    /// The ledger line it was paired with, if any.
    pub internal: Option<InternalLine>,
    /// Outcome.
    pub status: ReconciliationStatus,
    /// Statement amount minus ledger amount; zero unless `AmountMismatch`.
    pub amount_delta: Decimal,
    /// Human-readable note.
    pub remarks: String,
}

/// Outcome of a full reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// The nostro account.
    pub account: AccountCode,
    /// Currency of the account.
    pub currency: CurrencyCode,
    /// Statement date.
    pub statement_date: NaiveDate,
    /// One result per statement line, in statement order.
    pub results: Vec<ReconciliationResult>,
    /// Number of statement lines.
    pub total_external: usize,
    /// Number of ledger lines.
    pub total_internal: usize,
    /// Lines with status `Matched`.
    pub matched: usize,
    /// Lines with status `AmountMismatch`.
    pub amount_mismatches: usize,
    /// Lines with status `MissingLocal`.
    pub missing_local: usize,
    /// Ledger lines no statement line was paired with.
    pub unmatched_local: usize,
}

impl ReconciliationSummary {
    /// True when every line on both sides matched exactly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.matched == self.total_external && self.unmatched_local == 0
    }
}

/// Stateless reconciliation of statement lines against ledger lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NostroReconciliation;

impl NostroReconciliation {
    /// Pairs each statement line with at most one ledger line.
    ///
    /// For each statement line, in order, among the still-unpaired ledger
    /// lines with the same reference and direction:
    /// 1. the first with an equal amount is `Matched`
    /// 2. otherwise the first is an `AmountMismatch`
    /// 3. with no candidate the line is `MissingLocal`
    ///
    /// Ledger lines left unpaired are counted in `unmatched_local`.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a mismatch delta leaves the decimal range.
    pub fn reconcile(
        account: &AccountCode,
        currency: CurrencyCode,
        statement_date: NaiveDate,
        external: &[StatementLine],
        internal: &[InternalLine],
    ) -> Result<ReconciliationSummary, LedgerError> {
        let mut by_reference: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, line) in internal.iter().enumerate() {
            by_reference.entry(line.reference.as_str()).or_default().push(index);
        }
        let mut paired = vec![false; internal.len()];

        let mut summary = ReconciliationSummary {
            account: account.clone(),
            currency,
            statement_date,
            results: Vec::with_capacity(external.len()),
            total_external: external.len(),
            total_internal: internal.len(),
            matched: 0,
            amount_mismatches: 0,
            missing_local: 0,
            unmatched_local: 0,
        };

        for line in external {
            let candidates: Vec<usize> = by_reference
                .get(line.reference.as_str())
                .into_iter()
                .flatten()
                .copied()
                .filter(|&i| !paired[i] && internal[i].side == line.side)
                .collect();
            let exact = candidates
                .iter()
                .copied()
                .find(|&i| internal[i].amount == line.amount);

            let result = match (exact, candidates.first().copied()) {
                (Some(i), _) => {
                    paired[i] = true;
                    summary.matched += 1;
                    ReconciliationResult {
                        external: line.clone(),
                        internal: Some(internal[i].clone()),
                        status: ReconciliationStatus::Matched,
                        amount_delta: Decimal::ZERO,
                        remarks: "exact match".to_string(),
                    }
                }
                (None, Some(i)) => {
                    paired[i] = true;
                    summary.amount_mismatches += 1;
                    let delta = line
                        .amount
                        .checked_sub(internal[i].amount)
                        .ok_or(LedgerError::AmountOverflow { currency })?;
                    ReconciliationResult {
                        external: line.clone(),
                        internal: Some(internal[i].clone()),
                        status: ReconciliationStatus::AmountMismatch,
                        amount_delta: delta,
                        remarks: format!("amount differs by {delta}"),
                    }
                }
                (None, None) => {
                    summary.missing_local += 1;
                    let remarks = if by_reference.contains_key(line.reference.as_str()) {
                        format!(
                            "no unpaired ledger line for reference {} with direction {}",
                            line.reference,
                            direction(line.side)
                        )
                    } else {
                        format!("no ledger line found for reference {}", line.reference)
                    };
                    ReconciliationResult {
                        external: line.clone(),
                        internal: None,
                        status: ReconciliationStatus::MissingLocal,
                        amount_delta: Decimal::ZERO,
                        remarks,
                    }
                }
            };
            summary.results.push(result);
        }

        summary.unmatched_local = paired.iter().filter(|p| !**p).count();
        Ok(summary)
    }
}

fn direction(side: Side) -> &'static str {
    match side {
        Side::Debit => "D",
        Side::Credit => "C",
    }
}
