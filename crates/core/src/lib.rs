//! Core ledger logic for the corebank platform.
//!
//! This crate contains the double-entry posting engine with ZERO storage or
//! transport dependencies. Persistence and event delivery are reached through
//! the ports in [`ledger::ports`]; adapters live in other crates.
//!
//! # Modules
//!
//! - `ledger` - Account codes, posting pairs, journal entries, fiscal period
//!   gating, and the posting workflow

pub mod ledger;
