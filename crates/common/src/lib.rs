//! Shared types for the provenance ledger workspace.
//!
//! - [`AggregateId`]: stream identity used by the ledger store
//! - [`CompanyId`], [`ProductId`], [`OrderId`], [`Address`]: ledger identifiers
//! - [`Money`]: integer minor-unit amounts
//! - [`Clock`]: wall-clock source used for deadlines and event timestamps

pub mod clock;
pub mod ids;
pub mod money;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{Address, CompanyId, OrderId, ProductId};
pub use money::Money;
pub use types::AggregateId;
