//! In-memory ledger store.
//!
//! Writers are serialized by a store-wide writer lock that each open
//! transaction holds until it commits, rolls back, or is dropped. Staged
//! writes are applied inside one write-locked section at commit, so readers
//! never observe half of a unit of work.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use corebank_core::ledger::{
    AccountCode, Balance, BalanceDelta, BalanceRepository, DateRange, DomainEvent, FiscalPeriod,
    FiscalPeriodRepository, JournalEntry, JournalEntryRecord, JournalRepository,
    LedgerTransaction, PeriodStatus, RepositoryError, UnitOfWork,
};
use corebank_shared::types::{CurrencyCode, JournalEntryId, PageRequest, TenantId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// An event waiting in the outbox for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    /// Destination topic.
    pub topic: String,
    /// The event.
    pub event: DomainEvent,
}

type BalanceKey = (AccountCode, CurrencyCode);

#[derive(Debug, Default)]
struct LedgerState {
    journal: HashMap<JournalEntryId, JournalEntryRecord>,
    // Deltas bucketed by effective date; a balance is the sum of buckets <= as_of.
    balances: HashMap<BalanceKey, BTreeMap<NaiveDate, Decimal>>,
    periods: HashMap<(TenantId, FiscalPeriod), PeriodStatus>,
    outbox: Vec<OutboxMessage>,
}

impl LedgerState {
    fn balance(&self, account: &AccountCode, currency: CurrencyCode, as_of: NaiveDate) -> Decimal {
        self.balances
            .get(&(account.clone(), currency))
            .map_or(Decimal::ZERO, |by_date| sum_until(by_date, as_of))
    }

    /// Bucket maps of every touched key after applying `deltas`, leaving
    /// `self` untouched. Every as-of sum of a returned map is representable.
    fn plan_balances(
        &self,
        deltas: &[BalanceDelta],
    ) -> Result<HashMap<BalanceKey, BTreeMap<NaiveDate, Decimal>>, RepositoryError> {
        let mut planned: HashMap<BalanceKey, BTreeMap<NaiveDate, Decimal>> = HashMap::new();
        for delta in deltas {
            let key = (delta.account.clone(), delta.currency);
            let buckets = planned
                .entry(key.clone())
                .or_insert_with(|| self.balances.get(&key).cloned().unwrap_or_default());
            let bucket = buckets.entry(delta.effective_date).or_insert(Decimal::ZERO);
            *bucket = bucket
                .checked_add(delta.amount)
                .ok_or_else(|| balance_overflow(&key))?;
        }
        for (key, buckets) in &planned {
            buckets
                .values()
                .try_fold(Decimal::ZERO, |running, amount| running.checked_add(*amount))
                .ok_or_else(|| balance_overflow(key))?;
        }
        Ok(planned)
    }

    fn period_status(&self, tenant_id: TenantId, period: FiscalPeriod) -> PeriodStatus {
        self.periods
            .get(&(tenant_id, period))
            .copied()
            .unwrap_or_default()
    }

    /// Applies a unit of work. Nothing is written unless every write fits.
    fn apply(&mut self, writes: StagedWrites) -> Result<(), RepositoryError> {
        let balances = self.plan_balances(&writes.deltas)?;

        for record in writes.journal {
            self.journal.insert(record.id, record);
        }
        self.balances.extend(balances);
        for key in writes.closed_periods {
            self.periods.insert(key, PeriodStatus::Closed);
        }
        self.outbox.extend(writes.outbox);
        Ok(())
    }
}

fn balance_overflow((account, currency): &BalanceKey) -> RepositoryError {
    RepositoryError::Backend(format!("balance of {account} in {currency} exceeds the decimal range"))
}

// Prefix sums are checked on every write, so this cannot overflow.
fn sum_until(by_date: &BTreeMap<NaiveDate, Decimal>, as_of: NaiveDate) -> Decimal {
    by_date.range(..=as_of).map(|(_, amount)| *amount).sum()
}

#[derive(Debug, Default)]
struct StagedWrites {
    journal: Vec<JournalEntryRecord>,
    deltas: Vec<BalanceDelta>,
    closed_periods: Vec<(TenantId, FiscalPeriod)>,
    outbox: Vec<OutboxMessage>,
}

impl StagedWrites {
    fn record(&self, id: JournalEntryId) -> Option<&JournalEntryRecord> {
        self.journal.iter().rev().find(|record| record.id == id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    balance_writes: AtomicBool,
    commits: AtomicBool,
}

fn check_version(stored: Option<u64>, entry: &JournalEntry) -> Result<(), RepositoryError> {
    match stored {
        Some(stored) if entry.version() != stored + 1 => Err(RepositoryError::VersionConflict {
            entry_id: entry.id(),
            stored,
            attempted: entry.version(),
        }),
        _ => Ok(()),
    }
}

fn restore(record: JournalEntryRecord) -> Result<JournalEntry, RepositoryError> {
    let id = record.id;
    JournalEntry::reconstruct(record)
        .map_err(|err| RepositoryError::Corrupt(format!("journal entry {id}: {err}")))
}

/// Filters, orders (newest effective date first) and pages stored records.
fn select_page<'a>(
    records: impl Iterator<Item = &'a JournalEntryRecord>,
    tenant_id: TenantId,
    account: Option<&AccountCode>,
    range: DateRange,
    page: PageRequest,
) -> Result<(Vec<JournalEntry>, u64), RepositoryError> {
    let mut matches: Vec<&JournalEntryRecord> = records
        .filter(|r| r.tenant_id == tenant_id && range.contains(r.effective_date))
        .filter(|r| account.is_none_or(|account| r.touches(account)))
        .collect();
    matches.sort_by(|a, b| {
        b.effective_date
            .cmp(&a.effective_date)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = matches.len() as u64;
    let entries = matches
        .into_iter()
        .skip(page.offset())
        .take(page.limit())
        .map(|record| restore(record.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((entries, total))
}

/// Shared in-memory ledger. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    writer: Arc<Mutex<()>>,
    faults: Arc<Faults>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent balance write fail with `Unavailable`.
    pub fn fail_balance_writes(&self, fail: bool) {
        self.faults.balance_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent commit fail with `Unavailable`.
    pub fn fail_commits(&self, fail: bool) {
        self.faults.commits.store(fail, Ordering::SeqCst);
    }

    /// Committed outbox contents, oldest first.
    pub async fn outbox(&self) -> Vec<OutboxMessage> {
        self.state.read().await.outbox.clone()
    }

    /// Removes and returns the committed outbox contents, as a relay would.
    pub async fn drain_outbox(&self) -> Vec<OutboxMessage> {
        let _writer = self.writer.lock().await;
        std::mem::take(&mut self.state.write().await.outbox)
    }

    /// Number of committed journal entries.
    pub async fn journal_len(&self) -> usize {
        self.state.read().await.journal.len()
    }

    /// Every (account, currency) balance as of a date.
    pub async fn balances_as_of(&self, as_of: NaiveDate) -> Vec<Balance> {
        let state = self.state.read().await;
        state
            .balances
            .iter()
            .map(|((account, currency), by_date)| Balance {
                account: account.clone(),
                currency: *currency,
                amount: sum_until(by_date, as_of),
                as_of,
            })
            .collect()
    }

    async fn autocommit<F>(&self, write: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut LedgerState) -> Result<(), RepositoryError> + Send,
    {
        let _writer = self.writer.lock().await;
        let mut state = self.state.write().await;
        write(&mut state)
    }
}

impl JournalRepository for MemoryLedgerStore {
    async fn save(&self, entry: &JournalEntry) -> Result<(), RepositoryError> {
        let record = JournalEntryRecord::from(entry);
        self.autocommit(|state| {
            check_version(state.journal.get(&record.id).map(|r| r.version), entry)?;
            state.journal.insert(record.id, record);
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: JournalEntryId) -> Result<Option<JournalEntry>, RepositoryError> {
        let state = self.state.read().await;
        state.journal.get(&id).cloned().map(restore).transpose()
    }

    async fn list_by_account(
        &self,
        tenant_id: TenantId,
        account: &AccountCode,
        range: DateRange,
        page: PageRequest,
    ) -> Result<(Vec<JournalEntry>, u64), RepositoryError> {
        let state = self.state.read().await;
        select_page(state.journal.values(), tenant_id, Some(account), range, page)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: TenantId,
        range: DateRange,
        page: PageRequest,
    ) -> Result<(Vec<JournalEntry>, u64), RepositoryError> {
        let state = self.state.read().await;
        select_page(state.journal.values(), tenant_id, None, range, page)
    }
}

impl BalanceRepository for MemoryLedgerStore {
    async fn update_balance(&self, delta: &BalanceDelta) -> Result<(), RepositoryError> {
        if self.faults.balance_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("balance store offline".into()));
        }
        self.autocommit(|state| {
            let planned = state.plan_balances(std::slice::from_ref(delta))?;
            state.balances.extend(planned);
            Ok(())
        })
        .await
    }

    async fn get_balance(
        &self,
        account: &AccountCode,
        currency: CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Decimal, RepositoryError> {
        Ok(self.state.read().await.balance(account, currency, as_of))
    }
}

impl FiscalPeriodRepository for MemoryLedgerStore {
    async fn get_period_status(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> Result<PeriodStatus, RepositoryError> {
        Ok(self.state.read().await.period_status(tenant_id, period))
    }

    async fn close_period(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> Result<(), RepositoryError> {
        self.autocommit(|state| {
            state.periods.insert((tenant_id, period), PeriodStatus::Closed);
            Ok(())
        })
        .await
    }
}

impl UnitOfWork for MemoryLedgerStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, RepositoryError> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state),
            faults: Arc::clone(&self.faults),
            staged: Mutex::new(StagedWrites::default()),
            _writer: writer,
        })
    }
}

/// An open unit of work on a [`MemoryLedgerStore`].
///
/// Reads see committed state overlaid with this transaction's own writes.
pub struct MemoryTransaction {
    state: Arc<RwLock<LedgerState>>,
    faults: Arc<Faults>,
    staged: Mutex<StagedWrites>,
    _writer: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransaction").finish_non_exhaustive()
    }
}

impl JournalRepository for MemoryTransaction {
    async fn save(&self, entry: &JournalEntry) -> Result<(), RepositoryError> {
        let state = self.state.read().await;
        let mut staged = self.staged.lock().await;
        let stored = staged
            .record(entry.id())
            .or_else(|| state.journal.get(&entry.id()))
            .map(|record| record.version);
        check_version(stored, entry)?;
        staged.journal.push(JournalEntryRecord::from(entry));
        Ok(())
    }

    async fn find_by_id(&self, id: JournalEntryId) -> Result<Option<JournalEntry>, RepositoryError> {
        let state = self.state.read().await;
        let staged = self.staged.lock().await;
        staged
            .record(id)
            .or_else(|| state.journal.get(&id))
            .cloned()
            .map(restore)
            .transpose()
    }

    async fn list_by_account(
        &self,
        tenant_id: TenantId,
        account: &AccountCode,
        range: DateRange,
        page: PageRequest,
    ) -> Result<(Vec<JournalEntry>, u64), RepositoryError> {
        let state = self.state.read().await;
        let staged = self.staged.lock().await;
        let view = merged_view(&state, &staged);
        select_page(view.into_values(), tenant_id, Some(account), range, page)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: TenantId,
        range: DateRange,
        page: PageRequest,
    ) -> Result<(Vec<JournalEntry>, u64), RepositoryError> {
        let state = self.state.read().await;
        let staged = self.staged.lock().await;
        let view = merged_view(&state, &staged);
        select_page(view.into_values(), tenant_id, None, range, page)
    }
}

fn merged_view<'a>(
    state: &'a LedgerState,
    staged: &'a StagedWrites,
) -> HashMap<JournalEntryId, &'a JournalEntryRecord> {
    let mut view: HashMap<JournalEntryId, &JournalEntryRecord> =
        state.journal.iter().map(|(id, record)| (*id, record)).collect();
    for record in &staged.journal {
        view.insert(record.id, record);
    }
    view
}

impl BalanceRepository for MemoryTransaction {
    async fn update_balance(&self, delta: &BalanceDelta) -> Result<(), RepositoryError> {
        if self.faults.balance_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("balance store offline".into()));
        }
        self.staged.lock().await.deltas.push(delta.clone());
        Ok(())
    }

    async fn get_balance(
        &self,
        account: &AccountCode,
        currency: CurrencyCode,
        as_of: NaiveDate,
    ) -> Result<Decimal, RepositoryError> {
        let committed = self.state.read().await.balance(account, currency, as_of);
        self.staged
            .lock()
            .await
            .deltas
            .iter()
            .filter(|d| &d.account == account && d.currency == currency && d.effective_date <= as_of)
            .try_fold(committed, |running, d| running.checked_add(d.amount))
            .ok_or_else(|| balance_overflow(&(account.clone(), currency)))
    }
}

impl FiscalPeriodRepository for MemoryTransaction {
    async fn get_period_status(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> Result<PeriodStatus, RepositoryError> {
        if self
            .staged
            .lock()
            .await
            .closed_periods
            .contains(&(tenant_id, period))
        {
            return Ok(PeriodStatus::Closed);
        }
        Ok(self.state.read().await.period_status(tenant_id, period))
    }

    async fn close_period(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> Result<(), RepositoryError> {
        self.staged
            .lock()
            .await
            .closed_periods
            .push((tenant_id, period));
        Ok(())
    }
}

impl LedgerTransaction for MemoryTransaction {
    async fn enqueue_events(
        &self,
        topic: &str,
        events: &[DomainEvent],
    ) -> Result<(), RepositoryError> {
        let messages = events.iter().map(|event| OutboxMessage {
            topic: topic.to_string(),
            event: event.clone(),
        });
        self.staged.lock().await.outbox.extend(messages);
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        if self.faults.commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("commit rejected".into()));
        }
        let Self {
            state,
            staged,
            _writer,
            ..
        } = self;
        let writes = staged.into_inner();
        debug!(
            entries = writes.journal.len(),
            deltas = writes.deltas.len(),
            events = writes.outbox.len(),
            "Committing unit of work"
        );
        state.write().await.apply(writes)
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        drop(self);
        Ok(())
    }
}
