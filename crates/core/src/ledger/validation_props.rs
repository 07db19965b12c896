//! Property-based tests for posting validation.
//!
//! - Property 1: Balance law per currency, without overflow
//! - Property 2: No self-posting
//! - Property 3: Amount positivity

use corebank_shared::types::{CurrencyCode, Money};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::account::AccountCode;
use super::error::LedgerError;
use super::posting::{Leg, PostingPair, Side};
use super::validation::PostingValidator;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a zero or negative amount.
fn non_positive_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Strategy to generate a valid account code, with or without sub-ledger.
fn account_code() -> impl Strategy<Value = AccountCode> {
    prop_oneof![
        (0u32..10_000).prop_map(|base| AccountCode::must(&format!("{base:04}"))),
        (0u32..10_000, 0u32..1000)
            .prop_map(|(base, sub)| AccountCode::must(&format!("{base:04}-{sub:03}"))),
    ]
}

/// Strategy to generate two distinct account codes.
fn distinct_accounts() -> impl Strategy<Value = (AccountCode, AccountCode)> {
    (account_code(), account_code()).prop_filter("accounts must differ", |(a, b)| a != b)
}

/// Strategy to generate currency codes.
fn currency() -> impl Strategy<Value = CurrencyCode> {
    prop_oneof![Just("USD"), Just("EUR"), Just("IDR"), Just("JPY")]
        .prop_map(|code| CurrencyCode::new(code).unwrap())
}

/// Strategy to generate a valid posting pair.
fn posting_pair() -> impl Strategy<Value = PostingPair> {
    (distinct_accounts(), positive_amount(), currency()).prop_map(|((debit, credit), amount, ccy)| {
        PostingPair::new(debit, credit, amount, ccy.as_str(), "").unwrap()
    })
}

fn leg(account: &AccountCode, side: Side, amount: Decimal, currency: CurrencyCode) -> Leg {
    Leg {
        account: account.clone(),
        side,
        amount,
        currency,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Balance law per currency
    // =========================================================================

    /// Property 1.1: Any set of valid posting pairs balances.
    ///
    /// *For any* non-empty list of pairs built through the constructor,
    /// `validate_postings` SHALL accept it, whatever the currency mix.
    #[test]
    fn prop_constructed_pairs_always_balance(
        postings in prop::collection::vec(posting_pair(), 1..20),
    ) {
        let result = PostingValidator::validate_postings(&postings);
        prop_assert!(result.is_ok(), "Valid pairs should balance, got: {:?}", result);
    }

    /// Property 1.2: Skewing one leg breaks the balance in its currency.
    ///
    /// *For any* balanced leg set, adding `skew` to one debit SHALL fail with
    /// `UnbalancedEntry` naming that currency, with debits exceeding credits
    /// by exactly `skew`.
    #[test]
    fn prop_skewed_legs_rejected(
        (debit, credit) in distinct_accounts(),
        amount in positive_amount(),
        skew in positive_amount(),
        ccy in currency(),
    ) {
        let legs = vec![
            leg(&debit, Side::Debit, amount + skew, ccy),
            leg(&credit, Side::Credit, amount, ccy),
        ];

        match PostingValidator::validate_legs(&legs) {
            Err(LedgerError::UnbalancedEntry { currency, debits, credits }) => {
                prop_assert_eq!(currency, ccy);
                prop_assert_eq!(debits - credits, skew);
            }
            other => {
                prop_assert!(false, "expected UnbalancedEntry, got: {:?}", other);
            }
        }
    }

    /// Property 1.3: Multi-leg sets balance when totals match.
    ///
    /// *For any* split of one credit into two debits, validation SHALL accept it.
    #[test]
    fn prop_split_legs_accepted(
        (a, b) in distinct_accounts(),
        amount1 in positive_amount(),
        amount2 in positive_amount(),
        ccy in currency(),
    ) {
        let legs = vec![
            leg(&a, Side::Debit, amount1, ccy),
            leg(&a, Side::Debit, amount2, ccy),
            leg(&b, Side::Credit, amount1 + amount2, ccy),
        ];
        prop_assert!(PostingValidator::validate_legs(&legs).is_ok());
    }

    /// Property 1.4: Totals beyond the decimal range are rejected, never panic.
    ///
    /// *For any* list that repeats a near-maximum pair in one currency,
    /// validation SHALL return `AmountOverflow` for that currency.
    #[test]
    fn prop_overflowing_totals_rejected(
        (debit, credit) in distinct_accounts(),
        headroom in positive_amount(),
        copies in 2usize..6,
        ccy in currency(),
    ) {
        let amount = Decimal::MAX - headroom;
        let pair = PostingPair::new(debit, credit, amount, ccy.as_str(), "").unwrap();
        let postings = vec![pair; copies];

        match PostingValidator::validate_postings(&postings) {
            Err(LedgerError::AmountOverflow { currency }) => {
                prop_assert_eq!(currency, ccy);
            }
            other => {
                prop_assert!(false, "expected AmountOverflow, got: {:?}", other);
            }
        }
    }

    // =========================================================================
    // Property 2: No self-posting
    // =========================================================================

    /// Property 2.1: The constructor rejects debit == credit.
    #[test]
    fn prop_self_posting_rejected_by_constructor(
        account in account_code(),
        amount in positive_amount(),
        ccy in currency(),
    ) {
        let result = PostingPair::new(account.clone(), account, amount, ccy.as_str(), "");
        prop_assert!(matches!(result, Err(LedgerError::SelfPosting(_))));
    }

    /// Property 2.2: The validator finds a reconstructed self-posting anywhere in the list.
    #[test]
    fn prop_self_posting_found_by_validator(
        mut postings in prop::collection::vec(posting_pair(), 0..10),
        account in account_code(),
        amount in positive_amount(),
        ccy in currency(),
        position in any::<prop::sample::Index>(),
    ) {
        prop_assert!(PostingValidator::validate_not_self_posting(&postings).is_ok());

        let looped = PostingPair::reconstruct(
            account.clone(),
            account,
            Money::new(amount, ccy),
            String::new(),
        );
        let at = position.index(postings.len() + 1);
        postings.insert(at, looped);

        prop_assert!(matches!(
            PostingValidator::validate_not_self_posting(&postings),
            Err(LedgerError::SelfPosting(_))
        ));
    }

    // =========================================================================
    // Property 3: Amount positivity
    // =========================================================================

    /// Property 3.1: Zero and negative amounts are rejected by the constructor.
    #[test]
    fn prop_non_positive_amount_rejected(
        (debit, credit) in distinct_accounts(),
        amount in non_positive_amount(),
        ccy in currency(),
    ) {
        let result = PostingPair::new(debit, credit, amount, ccy.as_str(), "");
        prop_assert!(
            matches!(result, Err(LedgerError::NonPositiveAmount(a)) if a == amount),
            "Non-positive amount should be rejected, got: {:?}",
            result
        );
    }
}
