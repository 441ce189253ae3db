//! Product value objects.

use chrono::{DateTime, Utc};
use common::{Address, Money, ProductId};
use serde::{Deserialize, Serialize};

/// A directed composition edge: the product holding it consumed
/// `quantity_used` units of `product_id`, supplied by `supplier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEdge {
    pub product_id: ProductId,
    pub quantity_used: u64,
    pub supplier: Address,
    pub timestamp: DateTime<Utc>,
}

/// A requested component of a manufacture call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub product_id: ProductId,
    pub quantity_used: u64,
    pub supplier: Address,
}

impl ComponentSpec {
    pub fn new(product_id: ProductId, quantity_used: u64, supplier: impl Into<Address>) -> Self {
        Self {
            product_id,
            quantity_used,
            supplier: supplier.into(),
        }
    }
}

/// Descriptive attributes of a product being minted or manufactured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_hash: String,
    pub quantity: u64,
    pub price_per_unit: Money,
}

impl NewProduct {
    /// Creates a product description with empty description and image hash.
    pub fn new(name: impl Into<String>, quantity: u64, price_per_unit: Money) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            image_hash: String::new(),
            quantity,
            price_per_unit,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the content hash of the product image.
    pub fn with_image_hash(mut self, image_hash: impl Into<String>) -> Self {
        self.image_hash = image_hash.into();
        self
    }
}
