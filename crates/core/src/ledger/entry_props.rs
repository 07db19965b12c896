//! Property-based tests for the journal entry aggregate.
//!
//! - Property 4: Posting bumps the version exactly once
//! - Property 5: Transitions never mutate the receiver
//! - Property 6: Balance deltas sum to zero per currency

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use corebank_shared::types::{CurrencyCode, TenantId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::account::AccountCode;
use super::balance::deltas_for;
use super::entry::{EntryStatus, JournalEntry};
use super::error::LedgerError;
use super::posting::PostingPair;

fn now() -> DateTime<Utc> {
    "2024-06-30T12:00:00Z".parse().unwrap()
}

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a posting pair between two of a small set of accounts.
fn posting_pair() -> impl Strategy<Value = PostingPair> {
    let accounts = prop_oneof![Just("1000"), Just("1100-001"), Just("2000"), Just("3000")];
    let ccy = prop_oneof![Just("USD"), Just("EUR")];
    (accounts.clone(), accounts, positive_amount(), ccy)
        .prop_filter("accounts must differ", |(d, c, _, _)| d != c)
        .prop_map(|(d, c, amount, ccy)| {
            PostingPair::new(AccountCode::must(d), AccountCode::must(c), amount, ccy, "").unwrap()
        })
}

/// Strategy to generate an effective date in the first half of 2024.
fn effective_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..180).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(days)
    })
}

fn pending_entry(postings: Vec<PostingPair>, date: NaiveDate) -> JournalEntry {
    JournalEntry::new(TenantId::new(), date, postings, "", "", now()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 4.1: Posting once raises the version by exactly one and keeps postings.
    ///
    /// *For any* pending entry, `post` SHALL return a POSTED entry with
    /// version + 1, identical postings and exactly one pending event.
    #[test]
    fn prop_post_bumps_version_once(
        postings in prop::collection::vec(posting_pair(), 1..8),
        date in effective_date(),
    ) {
        let entry = pending_entry(postings, date);
        let posted = entry.post(now()).unwrap();

        prop_assert_eq!(posted.status(), EntryStatus::Posted);
        prop_assert_eq!(posted.version(), entry.version() + 1);
        prop_assert_eq!(posted.postings(), entry.postings());
        prop_assert_eq!(posted.domain_events().len(), 1);
    }

    /// Property 4.2: Posting a posted entry fails and changes nothing.
    #[test]
    fn prop_second_post_rejected(
        postings in prop::collection::vec(posting_pair(), 1..8),
        date in effective_date(),
    ) {
        let posted = pending_entry(postings, date).post(now()).unwrap();
        let snapshot = posted.clone();

        prop_assert!(matches!(posted.post(now()), Err(LedgerError::AlreadyPosted(_))));
        prop_assert_eq!(posted, snapshot);
    }

    /// Property 5.1: Backvalue returns a new value and leaves the original intact.
    #[test]
    fn prop_backvalue_does_not_mutate(
        postings in prop::collection::vec(posting_pair(), 1..8),
        date in effective_date(),
        new_date in effective_date(),
    ) {
        let posted = pending_entry(postings, date).post(now()).unwrap();
        let snapshot = posted.clone();
        let moved = posted.backvalue(new_date, now()).unwrap();

        prop_assert_eq!(&posted, &snapshot);
        prop_assert_eq!(moved.effective_date(), new_date);
        prop_assert_eq!(moved.version(), posted.version() + 1);
        prop_assert_eq!(moved.postings(), posted.postings());
        prop_assert_eq!(moved.domain_events().len(), posted.domain_events().len() + 1);
    }

    /// Property 6.1: Deltas sum to zero per currency, two per pair.
    ///
    /// *For any* entry, the signed deltas SHALL net to zero in each currency
    /// and there SHALL be exactly two deltas per posting pair.
    #[test]
    fn prop_deltas_net_to_zero(
        postings in prop::collection::vec(posting_pair(), 1..8),
        date in effective_date(),
    ) {
        let entry = pending_entry(postings, date);
        let deltas = deltas_for(&entry);
        prop_assert_eq!(deltas.len(), entry.postings().len() * 2);

        let mut net: BTreeMap<CurrencyCode, Decimal> = BTreeMap::new();
        for delta in &deltas {
            *net.entry(delta.currency).or_insert(Decimal::ZERO) += delta.amount;
        }
        prop_assert!(net.values().all(Decimal::is_zero), "net per currency: {:?}", net);
    }
}
