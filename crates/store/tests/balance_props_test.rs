//! Property-based tests for balance consistency through the full workflow.
//!
//! - Property 7: The trial balance stays balanced after any posting sequence
//! - Property 8: An account balance equals the signed sum of its postings up to the as-of date

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use corebank_core::ledger::{
    LedgerService, PostJournalEntryInput, PostingInput, TrialBalance,
};
use corebank_shared::config::LedgerConfig;
use corebank_shared::types::TenantId;
use corebank_store::{MemoryLedgerStore, RecordingPublisher};
use proptest::prelude::*;
use rust_decimal::Decimal;

const ACCOUNTS: [&str; 4] = ["1000", "1100-001", "2000", "4000"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Strategy to generate one posting pair between distinct accounts.
fn posting() -> impl Strategy<Value = PostingInput> {
    (0usize..4, 1usize..4, 1i64..1_000_000i64, prop_oneof![Just("USD"), Just("EUR")]).prop_map(
        |(debit, step, cents, ccy)| PostingInput {
            debit_account: ACCOUNTS[debit].to_string(),
            credit_account: ACCOUNTS[(debit + step) % 4].to_string(),
            amount: Decimal::new(cents, 2),
            currency: ccy.to_string(),
            description: String::new(),
        },
    )
}

/// Strategy to generate a day offset and the pairs of one entry.
fn entry() -> impl Strategy<Value = (i64, Vec<PostingInput>)> {
    (0i64..120, prop::collection::vec(posting(), 1..4))
}

fn signed_sum(
    entries: &[(i64, Vec<PostingInput>)],
    account: &str,
    currency: &str,
    as_of: NaiveDate,
) -> Decimal {
    entries
        .iter()
        .filter(|(offset, _)| start() + Duration::days(*offset) <= as_of)
        .flat_map(|(_, postings)| postings)
        .filter(|p| p.currency == currency)
        .map(|p| {
            if p.debit_account == account {
                p.amount
            } else if p.credit_account == account {
                -p.amount
            } else {
                Decimal::ZERO
            }
        })
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property 7.1 and 8.1: Postings keep the books balanced and balances
    /// match an independent recomputation.
    #[test]
    fn prop_balances_match_posting_history(
        entries in prop::collection::vec(entry(), 1..15),
        as_of_offset in 0i64..130,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let store = Arc::new(MemoryLedgerStore::new());
        let service = LedgerService::new(
            Arc::clone(&store),
            Arc::new(RecordingPublisher::new()),
            LedgerConfig::default(),
        );
        let tenant = TenantId::new();
        let as_of = start() + Duration::days(as_of_offset);

        runtime.block_on(async {
            for (offset, postings) in &entries {
                service
                    .post_journal_entry(PostJournalEntryInput {
                        tenant_id: tenant,
                        effective_date: start() + Duration::days(*offset),
                        postings: postings.clone(),
                        description: String::new(),
                        reference: String::new(),
                    })
                    .await
                    .unwrap();
            }
        });

        let lines = runtime.block_on(store.balances_as_of(as_of));
        let trial = TrialBalance::new(lines);
        prop_assert!(trial.is_balanced(), "totals: {:?}", trial.totals());

        for account in ACCOUNTS {
            for currency in ["USD", "EUR"] {
                let stored = runtime
                    .block_on(service.get_balance(account, currency, Some(as_of)))
                    .unwrap()
                    .amount;
                prop_assert_eq!(stored, signed_sum(&entries, account, currency, as_of));
            }
        }
    }
}
