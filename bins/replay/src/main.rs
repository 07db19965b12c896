//! Ledger batch replay.
//!
//! Posts a batch of journal entries for one tenant through the ledger
//! service, closes the listed fiscal periods, and prints a JSON report with
//! the resulting trial balance.
//!
//! Usage: cargo run --bin replay -- demos/march_batch.json

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use corebank_core::ledger::{LedgerService, PostJournalEntryInput, PostingInput, TrialBalance};
use corebank_shared::{AppConfig, AppError};
use corebank_shared::types::TenantId;
use corebank_store::{MemoryLedgerStore, TracingPublisher};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// One journal entry in a batch file. The tenant comes from the batch.
#[derive(Debug, Deserialize)]
struct BatchEntry {
    effective_date: NaiveDate,
    postings: Vec<PostingInput>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    reference: String,
}

#[derive(Debug, Deserialize)]
struct PeriodRef {
    year: i32,
    month: u32,
}

#[derive(Debug, Deserialize)]
struct Batch {
    tenant_id: TenantId,
    entries: Vec<BatchEntry>,
    #[serde(default)]
    close_periods: Vec<PeriodRef>,
    /// Trial balance date; defaults to the latest effective date in the batch.
    #[serde(default)]
    as_of: Option<NaiveDate>,
}

impl Batch {
    fn report_date(&self) -> NaiveDate {
        self.as_of
            .or_else(|| self.entries.iter().map(|e| e.effective_date).max())
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Serialize)]
struct Rejection {
    index: usize,
    reference: String,
    code: &'static str,
    status: u16,
    message: String,
}

#[derive(Debug, Serialize)]
struct ReplayReport {
    posted: usize,
    rejected: Vec<Rejection>,
    closed_periods: Vec<String>,
    as_of: NaiveDate,
    balanced: bool,
    trial_balance: TrialBalance,
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_batch(path: &Path) -> anyhow::Result<Batch> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read batch {}: {e}", path.display()))?;
    parse_batch(&raw)
}

fn parse_batch(raw: &str) -> anyhow::Result<Batch> {
    Ok(serde_json::from_str(raw)?)
}

async fn replay(
    service: &LedgerService<MemoryLedgerStore, TracingPublisher>,
    store: &MemoryLedgerStore,
    batch: Batch,
) -> ReplayReport {
    let as_of = batch.report_date();
    let tenant_id = batch.tenant_id;
    let mut posted = 0;
    let mut rejected = Vec::new();

    for (index, entry) in batch.entries.into_iter().enumerate() {
        let reference = entry.reference.clone();
        let input = PostJournalEntryInput {
            tenant_id,
            effective_date: entry.effective_date,
            postings: entry.postings,
            description: entry.description,
            reference: entry.reference,
        };
        match service.post_journal_entry(input).await {
            Ok(_) => posted += 1,
            Err(err) => {
                let code = err.error_code();
                let message = err.to_string();
                let app: AppError = err.into();
                warn!(index, reference = %reference, code, "Entry rejected");
                rejected.push(Rejection {
                    index,
                    reference,
                    code,
                    status: app.status_code(),
                    message,
                });
            }
        }
    }

    let mut closed_periods = Vec::new();
    for period in batch.close_periods {
        match service.close_period(tenant_id, period.year, period.month).await {
            Ok(closed) => closed_periods.push(closed.to_string()),
            Err(err) => warn!(
                year = period.year,
                month = period.month,
                code = err.error_code(),
                "Period not closed"
            ),
        }
    }

    let trial_balance = TrialBalance::new(store.balances_as_of(as_of).await);
    ReplayReport {
        posted,
        rejected,
        closed_periods,
        as_of,
        balanced: trial_balance.is_balanced(),
        trial_balance,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config);

    let Some(path) = std::env::args().nth(1) else {
        anyhow::bail!("usage: replay <batch.json>");
    };
    let batch = load_batch(Path::new(&path))?;
    info!(path = %path, entries = batch.entries.len(), "Replaying batch");

    let store = Arc::new(MemoryLedgerStore::new());
    let service = LedgerService::new(
        Arc::clone(&store),
        Arc::new(TracingPublisher),
        config.ledger.clone(),
    );

    let report = replay(&service, &store, batch).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.rejected.is_empty() {
        anyhow::bail!("{} of the batch entries were rejected", report.rejected.len());
    }
    Ok(())
}
