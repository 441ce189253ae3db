//! Append-only storage for ledger event streams.
//!
//! Every ledger record (company, product, order, id sequence) is a stream of
//! events. A [`Transaction`] groups appends to several streams; stores apply
//! it all-or-nothing and reject it if any stream moved past the version the
//! caller decided against.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{Result, StoreError};
pub use event::{StoredEvent, Version};
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use store::{CommitReceipt, LedgerStore, StreamAppend, Transaction};
