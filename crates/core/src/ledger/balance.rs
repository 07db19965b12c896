//! Balance deltas and balance read models.
//!
//! Balances are never written as absolute values. Each posting pair yields
//! two signed deltas (debit `+amount`, credit `-amount`) which the balance
//! repository applies as atomic increments keyed by effective date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use corebank_shared::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::AccountCode;
use super::entry::JournalEntry;

/// A signed increment to one (account, currency) balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    /// Account to adjust.
    pub account: AccountCode,
    /// Currency of the balance.
    pub currency: CurrencyCode,
    /// Signed amount: positive for debits, negative for credits.
    pub amount: Decimal,
    /// Date from which the delta counts towards as-of balances.
    pub effective_date: NaiveDate,
}

impl BalanceDelta {
    /// The same delta with the sign flipped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            amount: -self.amount,
            ..self.clone()
        }
    }
}

/// Deltas an entry contributes to balances: two per posting pair, debit first.
#[must_use]
pub fn deltas_for(entry: &JournalEntry) -> Vec<BalanceDelta> {
    entry
        .postings()
        .iter()
        .flat_map(|pair| pair.legs())
        .map(|leg| BalanceDelta {
            amount: leg.signed_amount(),
            account: leg.account,
            currency: leg.currency,
            effective_date: entry.effective_date(),
        })
        .collect()
}

/// Deltas that move an entry's contribution from `before`'s effective date
/// to `after`'s: reversals at the old date, then re-application at the new.
///
/// Empty when the dates are equal.
#[must_use]
pub fn redate_deltas(before: &JournalEntry, after: &JournalEntry) -> Vec<BalanceDelta> {
    if before.effective_date() == after.effective_date() {
        return Vec::new();
    }
    deltas_for(before)
        .iter()
        .map(BalanceDelta::reversed)
        .chain(deltas_for(after))
        .collect()
}

/// Balance of one account in one currency as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The account.
    pub account: AccountCode,
    /// The currency.
    pub currency: CurrencyCode,
    /// Σ debit deltas − Σ credit deltas up to and including `as_of`.
    pub amount: Decimal,
    /// The cut-off date.
    pub as_of: NaiveDate,
}

/// A set of balances that, for a consistent ledger, nets to zero per currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Balances ordered by currency, then account.
    pub lines: Vec<Balance>,
}

impl TrialBalance {
    /// Builds a trial balance, sorting the lines.
    #[must_use]
    pub fn new(mut lines: Vec<Balance>) -> Self {
        lines.sort_by(|a, b| (a.currency, &a.account).cmp(&(b.currency, &b.account)));
        Self { lines }
    }

    /// Net of all lines per currency.
    #[must_use]
    pub fn totals(&self) -> BTreeMap<CurrencyCode, Decimal> {
        let mut totals = BTreeMap::new();
        for line in &self.lines {
            *totals.entry(line.currency).or_insert(Decimal::ZERO) += line.amount;
        }
        totals
    }

    /// Returns true if every currency nets to zero.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.totals().values().all(Decimal::is_zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::posting::PostingPair;
    use chrono::{DateTime, Utc};
    use corebank_shared::types::TenantId;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2024-03-15T10:00:00Z".parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pair(debit: &str, credit: &str, amount: Decimal) -> PostingPair {
        PostingPair::new(
            AccountCode::must(debit),
            AccountCode::must(credit),
            amount,
            "USD",
            "",
        )
        .unwrap()
    }

    fn entry(postings: Vec<PostingPair>) -> JournalEntry {
        JournalEntry::new(TenantId::new(), date(2024, 3, 15), postings, "", "", now()).unwrap()
    }

    #[test]
    fn test_two_deltas_per_pair() {
        let entry = entry(vec![
            pair("1000", "2000", dec!(100)),
            pair("3000", "4000", dec!(200)),
        ]);
        let deltas = deltas_for(&entry);

        assert_eq!(deltas.len(), 4);
        let summary: Vec<(&str, Decimal)> = deltas
            .iter()
            .map(|d| (d.account.code(), d.amount))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("1000", dec!(100)),
                ("2000", dec!(-100)),
                ("3000", dec!(200)),
                ("4000", dec!(-200)),
            ]
        );
        assert!(deltas.iter().all(|d| d.effective_date == date(2024, 3, 15)));
        assert_eq!(deltas.iter().map(|d| d.amount).sum::<Decimal>(), Decimal::ZERO);
    }

    #[test]
    fn test_redate_moves_contribution() {
        let before = entry(vec![pair("1000", "2000", dec!(50))]);
        let after = before.backvalue(date(2024, 2, 1), now()).unwrap();
        let deltas = redate_deltas(&before, &after);

        assert_eq!(deltas.len(), 4);
        assert_eq!(deltas[0].amount, dec!(-50));
        assert_eq!(deltas[0].effective_date, date(2024, 3, 15));
        assert_eq!(deltas[2].amount, dec!(50));
        assert_eq!(deltas[2].effective_date, date(2024, 2, 1));
        assert!(redate_deltas(&before, &before).is_empty());
    }

    #[test]
    fn test_trial_balance_nets_to_zero() {
        let usd = CurrencyCode::new("USD").unwrap();
        let line = |account: &str, amount: Decimal| Balance {
            account: AccountCode::must(account),
            currency: usd,
            amount,
            as_of: date(2024, 3, 31),
        };
        let trial = TrialBalance::new(vec![line("2000", dec!(-500)), line("1000", dec!(500))]);
        assert_eq!(trial.lines[0].account.code(), "1000");
        assert!(trial.is_balanced());

        let skewed = TrialBalance::new(vec![line("1000", dec!(500))]);
        assert!(!skewed.is_balanced());
        assert_eq!(skewed.totals()[&usd], dec!(500));
    }
}
