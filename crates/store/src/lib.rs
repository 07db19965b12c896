//! In-memory adapters for the ledger ports.
//!
//! This crate provides:
//! - `MemoryLedgerStore`: journal, balances, fiscal periods and outbox behind
//!   one unit-of-work implementation with all-or-nothing commits
//! - `RecordingPublisher`: keeps published events for inspection
//! - `TracingPublisher`: logs published events
//!
//! The store is the reference for the storage consistency contract and the
//! backing for tests and the replay tool; it is not durable.

pub mod memory;
pub mod publisher;

pub use memory::{MemoryLedgerStore, MemoryTransaction, OutboxMessage};
pub use publisher::{RecordingPublisher, TracingPublisher};
