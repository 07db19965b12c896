//! Posting pairs and the debit/credit legs they expand to.

use corebank_shared::types::{CurrencyCode, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountCode;
use super::error::LedgerError;

/// Side of a ledger leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Debit leg; increases the account balance.
    Debit,
    /// Credit leg; decreases the account balance.
    Credit,
}

/// One side of a posting: a single account moved by a single amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    /// The account affected.
    pub account: AccountCode,
    /// Debit or credit.
    pub side: Side,
    /// Unsigned amount.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Leg {
    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.side {
            Side::Debit => self.amount,
            Side::Credit => -self.amount,
        }
    }
}

/// A balanced movement: one debit account, one credit account, one amount.
///
/// Immutable once built. Every pair carries its own currency so a journal
/// entry may mix currencies as long as each one balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingPair {
    debit_account: AccountCode,
    credit_account: AccountCode,
    amount: Money,
    description: String,
}

impl PostingPair {
    /// Builds a posting pair.
    ///
    /// # Errors
    ///
    /// - `SelfPosting` if the debit and credit accounts are the same
    /// - `NonPositiveAmount` if `amount` is zero or negative
    /// - `InvalidCurrency` if `currency` is not a well-formed ISO 4217 code
    pub fn new(
        debit_account: AccountCode,
        credit_account: AccountCode,
        amount: Decimal,
        currency: &str,
        description: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        if debit_account == credit_account {
            return Err(LedgerError::SelfPosting(debit_account));
        }
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let currency = CurrencyCode::new(currency)
            .map_err(|err| LedgerError::InvalidCurrency(err.0))?;

        Ok(Self {
            debit_account,
            credit_account,
            amount: Money::new(amount, currency),
            description: description.into(),
        })
    }

    /// Rebuilds a pair from stored fields without re-running the checks.
    ///
    /// Stored entries are re-validated as a whole by
    /// [`PostingValidator`](super::validation::PostingValidator) when the
    /// aggregate is reconstructed.
    #[must_use]
    pub fn reconstruct(
        debit_account: AccountCode,
        credit_account: AccountCode,
        amount: Money,
        description: String,
    ) -> Self {
        Self {
            debit_account,
            credit_account,
            amount,
            description,
        }
    }

    /// Account that is debited.
    #[must_use]
    pub fn debit_account(&self) -> &AccountCode {
        &self.debit_account
    }

    /// Account that is credited.
    #[must_use]
    pub fn credit_account(&self) -> &AccountCode {
        &self.credit_account
    }

    /// Unsigned amount moved.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount.amount
    }

    /// Currency of the amount.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.amount.currency
    }

    /// Amount and currency together.
    #[must_use]
    pub fn money(&self) -> Money {
        self.amount
    }

    /// Free-text narration for this pair.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The debit leg followed by the credit leg.
    #[must_use]
    pub fn legs(&self) -> [Leg; 2] {
        [
            Leg {
                account: self.debit_account.clone(),
                side: Side::Debit,
                amount: self.amount.amount,
                currency: self.amount.currency,
            },
            Leg {
                account: self.credit_account.clone(),
                side: Side::Credit,
                amount: self.amount.amount,
                currency: self.amount.currency,
            },
        ]
    }
}
