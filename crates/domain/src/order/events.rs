//! Order domain events.

use chrono::{DateTime, Utc};
use common::{Address, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{DeliveryEvent, OrderType};

/// Events that can occur on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed.
    OrderCreated(OrderCreatedData),

    /// A delivery milestone (or a deadline expiry) was recorded.
    DeliveryRecorded(DeliveryRecordedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderCreated(_) => "OrderCreated",
            OrderEvent::DeliveryRecorded(_) => "DeliveryRecorded",
        }
    }
}

/// Data for OrderCreated event. The total price is derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedData {
    pub order_id: OrderId,
    pub buyer: Address,
    pub seller: Address,
    pub product_id: ProductId,
    pub quantity: u64,
    pub unit_price: Money,
    pub order_type: OrderType,
    pub created_at: DateTime<Utc>,
    pub approval_deadline: DateTime<Utc>,
    pub payment_deadline: DateTime<Utc>,
    pub notes: String,
    pub listing_id: Option<String>,
}

/// Data for DeliveryRecorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecordedData {
    pub event: DeliveryEvent,

    /// Product that changed hands, set when the event settled the order.
    /// For a partial order this is the derived lot.
    #[serde(default)]
    pub settled_product_id: Option<ProductId>,
}

impl OrderEvent {
    /// Creates a DeliveryRecorded event.
    pub fn delivery_recorded(event: DeliveryEvent, settled_product_id: Option<ProductId>) -> Self {
        OrderEvent::DeliveryRecorded(DeliveryRecordedData {
            event,
            settled_product_id,
        })
    }
}
