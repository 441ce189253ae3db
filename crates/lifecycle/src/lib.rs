//! Order lifecycle for the provenance ledger.
//!
//! An order moves through the delivery stages one step at a time:
//!
//! ```text
//! created → approved → packed → shipped → delivered → quality_checked → payment_sent
//! ```
//!
//! Recording `payment_sent` settles the order: ownership of the product (or
//! of a lot split off it) moves to the buyer in the same transaction as the
//! order event. Orders that miss their approval or payment deadline are
//! forced into `expired_unapproved` or `expired_unpaid` instead.

pub mod engine;
pub mod outcome;
pub mod request;

pub use engine::OrderLifecycleEngine;
pub use outcome::{DeadlineExceeded, EventOutcome};
pub use request::{NewOrder, OrderDetails, OrderSubject};
