//! Domain layer of the provenance ledger.
//!
//! Records are event-sourced aggregates stored through a
//! [`ledger_store::LedgerStore`]:
//! - companies, keyed by address ([`company`])
//! - products forming the provenance graph ([`product`], [`trace`])
//! - orders and their delivery history ([`order`])
//!
//! Engines stage events into a [`UnitOfWork`] and commit it as one
//! transaction, re-deciding on optimistic concurrency conflicts.

pub mod aggregate;
pub mod company;
pub mod error;
pub mod order;
pub mod product;
pub mod repository;
pub mod sequence;
pub mod trace;

pub use aggregate::{Aggregate, DomainEvent};
pub use company::{Company, CompanyEvent, IdentityRegistry};
pub use error::{DomainError, ErrorKind};
pub use order::{
    DELIVERY_STAGES, Deadline, DeliveryEvent, Order, OrderEvent, OrderLedger, OrderStatus,
    OrderTerms, OrderType,
};
pub use product::{
    ComponentEdge, ComponentSpec, NewProduct, Product, ProductEvent, ProvenanceStore,
    TransferEngine,
};
pub use repository::{DEFAULT_MAX_COMMIT_ATTEMPTS, Repository, UnitOfWork};
pub use trace::TraceabilityEngine;
