//! Business rule validation for posting pairs.

use std::collections::BTreeMap;

use corebank_shared::types::CurrencyCode;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::posting::{Leg, PostingPair, Side};

/// Stateless checks shared by entry construction and reconstruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostingValidator;

impl PostingValidator {
    /// Validates that a set of posting pairs is non-empty and balances per currency.
    ///
    /// # Errors
    ///
    /// - `EmptyPostings` if `postings` is empty
    /// - `NonPositiveAmount` if a reconstructed pair carries a non-positive amount
    /// - `AmountOverflow` if a currency's totals leave the decimal range
    /// - `UnbalancedEntry` if debits and credits differ in any currency
    pub fn validate_postings(postings: &[PostingPair]) -> Result<(), LedgerError> {
        if postings.is_empty() {
            return Err(LedgerError::EmptyPostings);
        }
        let legs: Vec<Leg> = postings.iter().flat_map(PostingPair::legs).collect();
        Self::validate_legs(&legs)
    }

    /// Validates that no pair debits and credits the same account.
    ///
    /// An empty slice is accepted; emptiness is `validate_postings`' concern.
    ///
    /// # Errors
    ///
    /// Returns `SelfPosting` for the first offending pair.
    pub fn validate_not_self_posting(postings: &[PostingPair]) -> Result<(), LedgerError> {
        match postings
            .iter()
            .find(|pair| pair.debit_account() == pair.credit_account())
        {
            Some(pair) => Err(LedgerError::SelfPosting(pair.debit_account().clone())),
            None => Ok(()),
        }
    }

    /// Validates an arbitrary set of legs: every amount positive, and per
    /// currency the debit total equals the credit total.
    ///
    /// # Errors
    ///
    /// - `EmptyPostings` if `legs` is empty
    /// - `NonPositiveAmount` for the first leg with amount <= 0
    /// - `AmountOverflow` if a debit or credit total leaves the decimal range
    /// - `UnbalancedEntry` for the first currency (in code order) that does not balance
    pub fn validate_legs(legs: &[Leg]) -> Result<(), LedgerError> {
        if legs.is_empty() {
            return Err(LedgerError::EmptyPostings);
        }

        let mut totals: BTreeMap<CurrencyCode, (Decimal, Decimal)> = BTreeMap::new();
        for leg in legs {
            if leg.amount <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount(leg.amount));
            }
            let (debits, credits) = totals.entry(leg.currency).or_default();
            let total = match leg.side {
                Side::Debit => debits,
                Side::Credit => credits,
            };
            *total = total
                .checked_add(leg.amount)
                .ok_or(LedgerError::AmountOverflow {
                    currency: leg.currency,
                })?;
        }

        for (currency, (debits, credits)) in totals {
            if debits != credits {
                return Err(LedgerError::UnbalancedEntry {
                    currency,
                    debits,
                    credits,
                });
            }
        }

        Ok(())
    }
}
