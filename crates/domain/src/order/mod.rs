//! Orders: terms, delivery milestones and the order ledger.

mod aggregate;
mod events;
mod ledger;
mod status;

pub use aggregate::{Order, OrderTerms};
pub use events::{DeliveryRecordedData, OrderCreatedData, OrderEvent};
pub use ledger::OrderLedger;
pub use status::{DELIVERY_STAGES, Deadline, DeliveryEvent, OrderStatus, OrderType};
