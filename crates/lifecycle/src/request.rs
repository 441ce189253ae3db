//! Inputs and read models of the lifecycle engine.

use chrono::{DateTime, Utc};
use common::{Address, Money, ProductId};
use domain::{Company, Order, OrderType, Product};

/// What an order sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSubject {
    /// The whole remaining quantity of a product.
    FullProduct { product_id: ProductId },

    /// Part of a product, split into a new lot on settlement.
    PartialQuantity {
        original_product_id: ProductId,
        quantity: u64,
    },
}

impl OrderSubject {
    /// The product the order is placed against.
    pub fn product_id(&self) -> ProductId {
        match self {
            OrderSubject::FullProduct { product_id } => *product_id,
            OrderSubject::PartialQuantity {
                original_product_id,
                ..
            } => *original_product_id,
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            OrderSubject::FullProduct { .. } => OrderType::FullProduct,
            OrderSubject::PartialQuantity { .. } => OrderType::PartialQuantity,
        }
    }
}

/// A request to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer: Address,
    pub seller: Address,
    pub subject: OrderSubject,
    pub unit_price: Money,
    pub notes: String,
    pub approval_deadline: DateTime<Utc>,
    pub payment_deadline: DateTime<Utc>,
    pub listing_id: Option<String>,
}

/// An order together with the records it references.
///
/// Referenced records are resolved as they are now. Deactivated companies
/// are included; records that cannot be found are None.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub product: Option<Product>,
    pub buyer: Option<Company>,
    pub seller: Option<Company>,
}
