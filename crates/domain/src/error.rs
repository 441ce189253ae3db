//! Domain error types.

use common::{Money, OrderId, ProductId};
use ledger_store::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::order::OrderStatus;

/// Coarse error category, used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    InvalidTransition,
    InsufficientQuantity,
    Internal,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::InsufficientQuantity => "insufficient_quantity",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during ledger operations.
///
/// Every variant names the entity involved and the rule it broke.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Company not found: {company}")]
    CompanyNotFound { company: String },

    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    #[error("Component product {product_id} does not exist")]
    ComponentNotFound { product_id: ProductId },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    #[error("Address {address} is already registered")]
    DuplicateIdentity { address: String },

    #[error("Company {address} is deactivated")]
    IdentityDeactivated { address: String },

    #[error("Using product {component_id} would make product {product_id} its own ancestor")]
    CyclicComposition {
        product_id: ProductId,
        component_id: ProductId,
    },

    #[error("Composition cycle detected at product {product_id}")]
    TraceabilityCycleDetected { product_id: ProductId },

    #[error("{claimed} does not own product {product_id} (current owner: {owner})")]
    NotOwner {
        product_id: ProductId,
        claimed: String,
        owner: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid quantity {quantity}: {reason}")]
    InvalidQuantity { quantity: u64, reason: &'static str },

    #[error("Invalid price {price}: {reason}")]
    InvalidPrice { price: Money, reason: &'static str },

    #[error("Invalid deadlines: {0}")]
    InvalidDeadlines(String),

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Product {product_id} has {available} units, {requested} requested")]
    InsufficientQuantity {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    #[error("Component {product_id} has {available} units, {requested} requested")]
    InsufficientComponentQuantity {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    #[error("Ledger store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::CompanyNotFound { .. }
            | DomainError::ProductNotFound { .. }
            | DomainError::ComponentNotFound { .. }
            | DomainError::OrderNotFound { .. } => ErrorKind::NotFound,
            DomainError::DuplicateIdentity { .. }
            | DomainError::IdentityDeactivated { .. }
            | DomainError::CyclicComposition { .. }
            | DomainError::TraceabilityCycleDetected { .. }
            | DomainError::NotOwner { .. } => ErrorKind::Conflict,
            DomainError::InvalidInput(_)
            | DomainError::InvalidQuantity { .. }
            | DomainError::InvalidPrice { .. }
            | DomainError::InvalidDeadlines(_) => ErrorKind::InvalidInput,
            DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            DomainError::InsufficientQuantity { .. }
            | DomainError::InsufficientComponentQuantity { .. } => {
                ErrorKind::InsufficientQuantity
            }
            DomainError::Store(e) if e.is_conflict() => ErrorKind::Conflict,
            DomainError::Store(_) | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for optimistic concurrency failures that are worth a re-read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(e) if e.is_conflict())
    }
}
