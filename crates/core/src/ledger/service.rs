//! Ledger service: the posting workflow and the surrounding use cases.
//!
//! Every write runs inside one unit of work obtained from the store. Events
//! go to the outbox inside that unit and are handed to the publisher only
//! after commit; publication failures are logged and left to the outbox
//! relay.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use corebank_shared::config::{BackvaluePolicy, LedgerConfig};
use corebank_shared::types::{CurrencyCode, JournalEntryId, PageResponse, TenantId};
use tracing::{debug, info, warn};

use super::account::AccountCode;
use super::balance::{Balance, deltas_for, redate_deltas};
use super::entry::{EntryStatus, JournalEntry};
use super::error::LedgerError;
use super::events::DomainEvent;
use super::fiscal::{FiscalPeriod, PeriodStatus};
use super::ports::{
    BalanceRepository, DateRange, EventPublisher, FiscalPeriodRepository, JournalRepository,
    LedgerTransaction, UnitOfWork,
};
use super::types::{ListEntriesFilter, PostJournalEntryInput, PostingInput};
use super::validation::PostingValidator;

/// Orchestrates posting, backvaluing, period closing and ledger reads.
pub struct LedgerService<S: UnitOfWork, P: EventPublisher> {
    store: Arc<S>,
    publisher: Arc<P>,
    config: LedgerConfig,
}

impl<S: UnitOfWork, P: EventPublisher> LedgerService<S, P> {
    /// Create a new ledger service.
    #[must_use]
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: LedgerConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Topic events are published to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.config.events_topic
    }

    /// Posts a journal entry.
    ///
    /// 1. Converts caller input into value objects, failing fast
    /// 2. Validates the postings
    /// 3. Creates the entry and posts it
    /// 4. In one unit of work: checks the fiscal period is open, saves the
    ///    entry, applies two balance deltas per pair, enqueues the events
    /// 5. After commit, publishes the events
    ///
    /// Returns the posted entry with its pending events drained.
    ///
    /// # Errors
    ///
    /// Validation and state errors are returned before anything is written.
    /// Repository errors roll the unit of work back.
    pub async fn post_journal_entry(
        &self,
        input: PostJournalEntryInput,
    ) -> Result<JournalEntry, LedgerError> {
        let postings = input
            .postings
            .iter()
            .map(PostingInput::to_pair)
            .collect::<Result<Vec<_>, _>>()?;
        PostingValidator::validate_postings(&postings)?;

        let now = Utc::now();
        let entry = JournalEntry::new(
            input.tenant_id,
            input.effective_date,
            postings,
            input.description,
            input.reference,
            now,
        )?;
        let (posted, events) = entry.post(now)?.take_domain_events();

        let tx = self.begin().await?;
        if let Err(err) = self.write_posted_entry(&tx, &posted, &events).await {
            Self::abort(tx).await;
            return Err(err);
        }
        tx.commit()
            .await
            .map_err(|e| LedgerError::repository("commit posting", e))?;

        info!(
            entry_id = %posted.id(),
            tenant_id = %posted.tenant_id(),
            effective_date = %posted.effective_date(),
            pairs = posted.postings().len(),
            "Journal entry posted"
        );
        self.publish(&events).await;
        Ok(posted)
    }

    async fn write_posted_entry(
        &self,
        tx: &S::Transaction,
        entry: &JournalEntry,
        events: &[DomainEvent],
    ) -> Result<(), LedgerError> {
        self.ensure_period_open(tx, entry.tenant_id(), entry.effective_date())
            .await?;
        tx.save(entry)
            .await
            .map_err(|e| LedgerError::repository("save journal entry", e))?;
        for delta in deltas_for(entry) {
            tx.update_balance(&delta)
                .await
                .map_err(|e| LedgerError::repository("update balance", e))?;
        }
        tx.enqueue_events(self.topic(), events)
            .await
            .map_err(|e| LedgerError::repository("enqueue events", e))
    }

    /// Moves an entry to a new effective date.
    ///
    /// Posted entries have their balance contribution moved from the old
    /// date to the new one in the same unit of work. Both the old and the
    /// new fiscal period must be open.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry does not exist
    /// - `InvalidStatusTransition` if the configured policy forbids
    ///   backvaluing a posted entry
    /// - `BackvalueInFuture` if `new_date` is after today
    /// - `PeriodClosed` if either period is closed
    /// - `VersionConflict` if the entry changed concurrently
    pub async fn backvalue_entry(
        &self,
        id: JournalEntryId,
        new_date: NaiveDate,
    ) -> Result<JournalEntry, LedgerError> {
        let tx = self.begin().await?;
        let moved = match self.write_backvalue(&tx, id, new_date).await {
            Ok(moved) => moved,
            Err(err) => {
                Self::abort(tx).await;
                return Err(err);
            }
        };
        let (moved, events) = moved.take_domain_events();
        tx.commit()
            .await
            .map_err(|e| LedgerError::repository("commit backvalue", e))?;

        info!(
            entry_id = %moved.id(),
            effective_date = %moved.effective_date(),
            version = moved.version(),
            "Journal entry backvalued"
        );
        self.publish(&events).await;
        Ok(moved)
    }

    async fn write_backvalue(
        &self,
        tx: &S::Transaction,
        id: JournalEntryId,
        new_date: NaiveDate,
    ) -> Result<JournalEntry, LedgerError> {
        let current = tx
            .find_by_id(id)
            .await
            .map_err(|e| LedgerError::repository("find journal entry", e))?
            .ok_or(LedgerError::EntryNotFound(id))?;

        if current.status() == EntryStatus::Posted
            && self.config.backvalue_policy == BackvaluePolicy::PendingOnly
        {
            return Err(LedgerError::InvalidStatusTransition {
                from: EntryStatus::Posted,
                action: "backvalue",
            });
        }

        let moved = current.backvalue(new_date, Utc::now())?;
        self.ensure_period_open(tx, current.tenant_id(), current.effective_date())
            .await?;
        self.ensure_period_open(tx, moved.tenant_id(), moved.effective_date())
            .await?;

        tx.save(&moved)
            .await
            .map_err(|e| LedgerError::repository("save journal entry", e))?;
        if moved.is_posted() {
            for delta in redate_deltas(&current, &moved) {
                tx.update_balance(&delta)
                    .await
                    .map_err(|e| LedgerError::repository("update balance", e))?;
            }
        }
        tx.enqueue_events(self.topic(), &moved.domain_events())
            .await
            .map_err(|e| LedgerError::repository("enqueue events", e))?;
        Ok(moved)
    }

    /// Closes a fiscal period for a tenant.
    ///
    /// Runs in a unit of work so it serializes with concurrent postings.
    ///
    /// # Errors
    ///
    /// - `InvalidFiscalPeriod` for an out-of-range year or month
    /// - `PeriodAlreadyClosed` if the period is already closed
    pub async fn close_period(
        &self,
        tenant_id: TenantId,
        year: i32,
        month: u32,
    ) -> Result<FiscalPeriod, LedgerError> {
        if tenant_id.into_inner().is_nil() {
            return Err(LedgerError::MissingTenant);
        }
        let period = FiscalPeriod::new(year, month)?;
        let event = DomainEvent::period_closed(tenant_id, period, Utc::now());
        let events = [event];

        let tx = self.begin().await?;
        if let Err(err) = self.write_period_close(&tx, tenant_id, period, &events).await {
            Self::abort(tx).await;
            return Err(err);
        }
        tx.commit()
            .await
            .map_err(|e| LedgerError::repository("commit period close", e))?;

        info!(tenant_id = %tenant_id, period = %period, "Fiscal period closed");
        self.publish(&events).await;
        Ok(period)
    }

    async fn write_period_close(
        &self,
        tx: &S::Transaction,
        tenant_id: TenantId,
        period: FiscalPeriod,
        events: &[DomainEvent],
    ) -> Result<(), LedgerError> {
        let status = tx
            .get_period_status(tenant_id, period)
            .await
            .map_err(|e| LedgerError::repository("get period status", e))?;
        if status == PeriodStatus::Closed {
            return Err(LedgerError::PeriodAlreadyClosed(period));
        }
        tx.close_period(tenant_id, period)
            .await
            .map_err(|e| LedgerError::repository("close period", e))?;
        tx.enqueue_events(self.topic(), events)
            .await
            .map_err(|e| LedgerError::repository("enqueue events", e))
    }

    /// Status of a fiscal period.
    ///
    /// # Errors
    ///
    /// Repository errors propagate.
    pub async fn get_period_status(
        &self,
        tenant_id: TenantId,
        period: FiscalPeriod,
    ) -> Result<PeriodStatus, LedgerError> {
        self.store
            .get_period_status(tenant_id, period)
            .await
            .map_err(|e| LedgerError::repository("get period status", e))
    }

    /// Balance of an account in a currency as of a date (default: today, UTC).
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccountCode` or `InvalidCurrency` for malformed input.
    pub async fn get_balance(
        &self,
        account: &str,
        currency: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Balance, LedgerError> {
        let account = AccountCode::new(account)?;
        let currency =
            CurrencyCode::new(currency).map_err(|err| LedgerError::InvalidCurrency(err.0))?;
        let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());

        let amount = self
            .store
            .get_balance(&account, currency, as_of)
            .await
            .map_err(|e| LedgerError::repository("get balance", e))?;

        Ok(Balance {
            account,
            currency,
            amount,
            as_of,
        })
    }

    /// Loads a journal entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if it does not exist.
    pub async fn get_journal_entry(&self, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(|e| LedgerError::repository("find journal entry", e))?
            .ok_or(LedgerError::EntryNotFound(id))
    }

    /// Lists a tenant's journal entries, optionally by account and date range.
    ///
    /// Page size defaults to 50 and is capped at 1000.
    ///
    /// # Errors
    ///
    /// Returns `MissingTenant` or `InvalidAccountCode` for bad filters.
    pub async fn list_journal_entries(
        &self,
        filter: ListEntriesFilter,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        if filter.tenant_id.into_inner().is_nil() {
            return Err(LedgerError::MissingTenant);
        }
        let account = filter
            .account
            .as_deref()
            .map(AccountCode::new)
            .transpose()?;
        let range = DateRange {
            from: filter.from,
            to: filter.to,
        };
        let page = filter.page.normalized();

        let (entries, total) = match &account {
            Some(account) => {
                self.store
                    .list_by_account(filter.tenant_id, account, range, page)
                    .await
            }
            None => self.store.list_by_tenant(filter.tenant_id, range, page).await,
        }
        .map_err(|e| LedgerError::repository("list journal entries", e))?;

        Ok(PageResponse::new(entries, page, total))
    }

    async fn ensure_period_open(
        &self,
        tx: &S::Transaction,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        if !self.config.enforce_period_gating {
            return Ok(());
        }
        let period = FiscalPeriod::containing(date);
        tx.get_period_status(tenant_id, period)
            .await
            .map_err(|e| LedgerError::repository("get period status", e))?
            .ensure_open(period)
    }

    async fn begin(&self) -> Result<S::Transaction, LedgerError> {
        self.store
            .begin()
            .await
            .map_err(|e| LedgerError::repository("begin unit of work", e))
    }

    async fn abort(tx: S::Transaction) {
        if let Err(err) = tx.rollback().await {
            warn!(error = %err, "Rollback failed; uncommitted writes are discarded with the transaction");
        }
    }

    async fn publish(&self, events: &[DomainEvent]) {
        if events.is_empty() {
            return;
        }
        match self.publisher.publish(self.topic(), events).await {
            Ok(()) => debug!(count = events.len(), topic = self.topic(), "Events published"),
            Err(err) => warn!(
                error = %err,
                count = events.len(),
                topic = self.topic(),
                "Event publication failed; outbox relay will redeliver"
            ),
        }
    }
}
