//! Product domain events.

use chrono::{DateTime, Utc};
use common::{Address, Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::ComponentEdge;

/// Events that can occur on a product node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// A raw product was minted by its creator.
    ProductMinted(ProductCreatedData),

    /// A product was manufactured from components. The edge set is final.
    ProductManufactured(ProductCreatedData),

    /// A lot was split off another product by a partial transfer.
    LotDerived(LotDerivedData),

    /// Units were consumed by a manufacture.
    StockConsumed(StockConsumedData),

    /// Units were split off into a derived lot.
    LotSplit(LotSplitData),

    /// The product changed hands.
    OwnershipTransferred(OwnershipTransferredData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductMinted(_) => "ProductMinted",
            ProductEvent::ProductManufactured(_) => "ProductManufactured",
            ProductEvent::LotDerived(_) => "LotDerived",
            ProductEvent::StockConsumed(_) => "StockConsumed",
            ProductEvent::LotSplit(_) => "LotSplit",
            ProductEvent::OwnershipTransferred(_) => "OwnershipTransferred",
        }
    }
}

/// Data for ProductMinted and ProductManufactured events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreatedData {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub image_hash: String,
    pub quantity: u64,
    pub price_per_unit: Money,
    pub creator: Address,
    #[serde(default)]
    pub components: Vec<ComponentEdge>,
    pub created_at: DateTime<Utc>,
}

/// Data for LotDerived event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotDerivedData {
    pub product_id: ProductId,
    pub derived_from: ProductId,
    pub name: String,
    pub description: String,
    pub image_hash: String,
    pub quantity: u64,
    pub price_per_unit: Money,
    pub is_manufactured: bool,
    pub original_creator: Address,
    pub ownership_history: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

/// Data for StockConsumed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockConsumedData {
    pub quantity: u64,
    pub consumed_by: ProductId,
    pub consumed_at: DateTime<Utc>,
}

/// Data for LotSplit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotSplitData {
    pub lot_id: ProductId,
    pub quantity: u64,
    pub to: Address,
    pub split_at: DateTime<Utc>,
}

/// Data for OwnershipTransferred event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipTransferredData {
    pub from: Address,
    pub to: Address,
    pub transferred_at: DateTime<Utc>,
}

// Convenience constructors for events
impl ProductEvent {
    /// Creates a StockConsumed event.
    pub fn stock_consumed(quantity: u64, consumed_by: ProductId, at: DateTime<Utc>) -> Self {
        ProductEvent::StockConsumed(StockConsumedData {
            quantity,
            consumed_by,
            consumed_at: at,
        })
    }

    /// Creates a LotSplit event.
    pub fn lot_split(lot_id: ProductId, quantity: u64, to: Address, at: DateTime<Utc>) -> Self {
        ProductEvent::LotSplit(LotSplitData {
            lot_id,
            quantity,
            to,
            split_at: at,
        })
    }

    /// Creates an OwnershipTransferred event.
    pub fn ownership_transferred(from: Address, to: Address, at: DateTime<Utc>) -> Self {
        ProductEvent::OwnershipTransferred(OwnershipTransferredData {
            from,
            to,
            transferred_at: at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_is_tagged() {
        let event = ProductEvent::stock_consumed(40, ProductId::new(2), Utc::now());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StockConsumed");
        assert_eq!(json["data"]["quantity"], 40);
        assert_eq!(json["data"]["consumed_by"], 2);

        let back: ProductEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "StockConsumed");
    }
}
