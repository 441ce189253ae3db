//! Product aggregate.

use chrono::{DateTime, Utc};
use common::{Address, Money, ProductId};
use ledger_store::Version;

use crate::aggregate::Aggregate;
use crate::error::DomainError;

use super::{ComponentEdge, NewProduct, ProductEvent, events::{LotDerivedData, ProductCreatedData}};

/// A node of the provenance graph.
///
/// The current owner is always the last entry of the ownership history and
/// is never stored on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    image_hash: String,
    quantity: u64,
    price_per_unit: Money,
    is_manufactured: bool,
    components: Vec<ComponentEdge>,
    original_creator: Address,
    ownership_history: Vec<Address>,
    created_time: Option<DateTime<Utc>>,
    exists: bool,
    derived_from: Option<ProductId>,
    consumed_by: Vec<ProductId>,
    split_lots: Vec<ProductId>,
    version: Version,
}

impl Aggregate for Product {
    type Event = ProductEvent;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductMinted(data) => self.apply_created(data, false),
            ProductEvent::ProductManufactured(data) => self.apply_created(data, true),
            ProductEvent::LotDerived(data) => self.apply_lot_derived(data),
            ProductEvent::StockConsumed(data) => {
                self.quantity = self.quantity.saturating_sub(data.quantity);
                if !self.consumed_by.contains(&data.consumed_by) {
                    self.consumed_by.push(data.consumed_by);
                }
            }
            ProductEvent::LotSplit(data) => {
                self.quantity = self.quantity.saturating_sub(data.quantity);
                self.split_lots.push(data.lot_id);
            }
            ProductEvent::OwnershipTransferred(data) => {
                self.ownership_history.push(data.to);
            }
        }
    }
}

impl Product {
    fn apply_created(&mut self, data: ProductCreatedData, is_manufactured: bool) {
        self.id = data.product_id;
        self.name = data.name;
        self.description = data.description;
        self.image_hash = data.image_hash;
        self.quantity = data.quantity;
        self.price_per_unit = data.price_per_unit;
        self.is_manufactured = is_manufactured;
        self.components = data.components;
        self.ownership_history = vec![data.creator.clone()];
        self.original_creator = data.creator;
        self.created_time = Some(data.created_at);
        self.exists = true;
    }

    fn apply_lot_derived(&mut self, data: LotDerivedData) {
        self.id = data.product_id;
        self.name = data.name;
        self.description = data.description;
        self.image_hash = data.image_hash;
        self.quantity = data.quantity;
        self.price_per_unit = data.price_per_unit;
        self.is_manufactured = data.is_manufactured;
        self.original_creator = data.original_creator;
        self.ownership_history = data.ownership_history;
        self.created_time = Some(data.created_at);
        self.derived_from = Some(data.derived_from);
        self.exists = true;
    }
}

// Query methods
impl Product {
    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image_hash(&self) -> &str {
        &self.image_hash
    }

    /// Remaining units.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn price_per_unit(&self) -> Money {
        self.price_per_unit
    }

    pub fn is_manufactured(&self) -> bool {
        self.is_manufactured
    }

    /// Composition edges, in the order they were declared.
    pub fn components(&self) -> &[ComponentEdge] {
        &self.components
    }

    pub fn original_creator(&self) -> &Address {
        &self.original_creator
    }

    /// Returns the last entry of the ownership history.
    pub fn current_owner(&self) -> Option<&Address> {
        self.ownership_history.last()
    }

    pub fn ownership_history(&self) -> &[Address] {
        &self.ownership_history
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    /// The product this lot was split from, if it is a derived lot.
    pub fn derived_from(&self) -> Option<ProductId> {
        self.derived_from
    }

    /// Products manufactured from this one.
    pub fn consumed_by(&self) -> &[ProductId] {
        &self.consumed_by
    }

    /// Lots split off this product.
    pub fn split_lots(&self) -> &[ProductId] {
        &self.split_lots
    }

    /// Returns true if `address` is the current owner.
    pub fn is_owned_by(&self, address: &Address) -> bool {
        self.current_owner() == Some(address)
    }
}

// Command methods (return events)
impl Product {
    /// Mints a raw product owned by `creator`.
    pub fn mint(
        &self,
        id: ProductId,
        spec: &NewProduct,
        creator: &Address,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_new(id)?;
        Self::validate_new(spec)?;

        Ok(vec![ProductEvent::ProductMinted(Self::created_data(
            id,
            spec,
            creator,
            Vec::new(),
            now,
        ))])
    }

    /// Creates a manufactured product with the given composition edges.
    ///
    /// Component existence, ownership, stock and acyclicity are checked by
    /// the caller against the component records.
    pub fn manufacture(
        &self,
        id: ProductId,
        spec: &NewProduct,
        creator: &Address,
        components: Vec<ComponentEdge>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_new(id)?;
        Self::validate_new(spec)?;
        if components.is_empty() {
            return Err(DomainError::InvalidInput(
                "a manufactured product needs at least one component".to_string(),
            ));
        }

        Ok(vec![ProductEvent::ProductManufactured(Self::created_data(
            id, spec, creator, components, now,
        ))])
    }

    /// Consumes `quantity` units as a component of `consumed_by`.
    pub fn consume(
        &self,
        quantity: u64,
        consumed_by: ProductId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        if quantity > self.quantity {
            return Err(DomainError::InsufficientComponentQuantity {
                product_id: self.id,
                requested: quantity,
                available: self.quantity,
            });
        }

        Ok(vec![ProductEvent::stock_consumed(quantity, consumed_by, now)])
    }

    /// Transfers the whole product from `from` to `to`.
    pub fn transfer(
        &self,
        from: &Address,
        to: &Address,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_owner(from)?;
        if from == to {
            return Err(DomainError::InvalidInput(format!(
                "product {} is already owned by {to}",
                self.id
            )));
        }

        Ok(vec![ProductEvent::ownership_transferred(
            from.clone(),
            to.clone(),
            now,
        )])
    }

    /// Splits `quantity` units off into the new lot `lot_id`, owned by `to`.
    ///
    /// Returns the events for this product and the creation event of the lot.
    pub fn split(
        &self,
        lot_id: ProductId,
        from: &Address,
        to: &Address,
        quantity: u64,
        now: DateTime<Utc>,
    ) -> Result<(Vec<ProductEvent>, ProductEvent), DomainError> {
        self.ensure_exists()?;
        self.ensure_owner(from)?;
        if from == to {
            return Err(DomainError::InvalidInput(format!(
                "product {} is already owned by {to}",
                self.id
            )));
        }
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity,
                reason: "split quantity must be greater than 0",
            });
        }
        if quantity > self.quantity {
            return Err(DomainError::InsufficientQuantity {
                product_id: self.id,
                requested: quantity,
                available: self.quantity,
            });
        }

        let mut ownership_history = self.ownership_history.clone();
        ownership_history.push(to.clone());

        let lot = ProductEvent::LotDerived(LotDerivedData {
            product_id: lot_id,
            derived_from: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            image_hash: self.image_hash.clone(),
            quantity,
            price_per_unit: self.price_per_unit,
            is_manufactured: self.is_manufactured,
            original_creator: self.original_creator.clone(),
            ownership_history,
            created_at: now,
        });

        Ok((
            vec![ProductEvent::lot_split(lot_id, quantity, to.clone(), now)],
            lot,
        ))
    }

    fn ensure_new(&self, id: ProductId) -> Result<(), DomainError> {
        if self.exists {
            return Err(DomainError::InvalidInput(format!(
                "product {id} already exists"
            )));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.exists {
            return Err(DomainError::ProductNotFound {
                product_id: self.id,
            });
        }
        Ok(())
    }

    fn ensure_owner(&self, claimed: &Address) -> Result<(), DomainError> {
        if !self.is_owned_by(claimed) {
            return Err(DomainError::NotOwner {
                product_id: self.id,
                claimed: claimed.to_string(),
                owner: self
                    .current_owner()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn validate_new(spec: &NewProduct) -> Result<(), DomainError> {
        if spec.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: spec.quantity,
                reason: "product quantity must be greater than 0",
            });
        }
        if spec.price_per_unit.is_negative() {
            return Err(DomainError::InvalidPrice {
                price: spec.price_per_unit,
                reason: "price per unit must not be negative",
            });
        }
        Ok(())
    }

    fn created_data(
        id: ProductId,
        spec: &NewProduct,
        creator: &Address,
        components: Vec<ComponentEdge>,
        now: DateTime<Utc>,
    ) -> ProductCreatedData {
        ProductCreatedData {
            product_id: id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            image_hash: spec.image_hash.clone(),
            quantity: spec.quantity,
            price_per_unit: spec.price_per_unit,
            creator: creator.clone(),
            components,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Address {
        Address::new("0xX")
    }

    fn y() -> Address {
        Address::new("0xY")
    }

    fn minted(quantity: u64) -> Product {
        let mut product = Product::default();
        let events = product
            .mint(
                ProductId::new(1),
                &NewProduct::new("Cocoa", quantity, Money::from_minor_units(10)),
                &x(),
                Utc::now(),
            )
            .unwrap();
        product.apply_events(events);
        product
    }

    #[test]
    fn mint_starts_ownership_history() {
        let product = minted(100);
        assert!(product.exists());
        assert!(!product.is_manufactured());
        assert_eq!(product.ownership_history(), &[x()]);
        assert_eq!(product.current_owner(), Some(&x()));
        assert_eq!(product.original_creator(), &x());
        assert!(product.components().is_empty());
    }

    #[test]
    fn mint_validates_quantity_and_price() {
        let product = Product::default();
        let zero = product.mint(
            ProductId::new(1),
            &NewProduct::new("Cocoa", 0, Money::zero()),
            &x(),
            Utc::now(),
        );
        assert!(matches!(zero, Err(DomainError::InvalidQuantity { .. })));

        let negative = product.mint(
            ProductId::new(1),
            &NewProduct::new("Cocoa", 1, Money::from_minor_units(-1)),
            &x(),
            Utc::now(),
        );
        assert!(matches!(negative, Err(DomainError::InvalidPrice { .. })));

        let free = product.mint(
            ProductId::new(1),
            &NewProduct::new("Sample", 1, Money::zero()),
            &x(),
            Utc::now(),
        );
        assert!(free.is_ok());
    }

    #[test]
    fn consume_decrements_and_links_forward() {
        let mut product = minted(100);
        let events = product.consume(40, ProductId::new(2), Utc::now()).unwrap();
        product.apply_events(events);

        assert_eq!(product.quantity(), 60);
        assert_eq!(product.consumed_by(), &[ProductId::new(2)]);
        assert!(matches!(
            product.consume(61, ProductId::new(3), Utc::now()),
            Err(DomainError::InsufficientComponentQuantity { available: 60, .. })
        ));
    }

    #[test]
    fn transfer_appends_owner() {
        let mut product = minted(10);
        let events = product.transfer(&x(), &y(), Utc::now()).unwrap();
        product.apply_events(events);

        assert_eq!(product.ownership_history(), &[x(), y()]);
        assert_eq!(product.current_owner(), Some(&y()));
        assert_eq!(product.original_creator(), &x());
    }

    #[test]
    fn transfer_requires_current_owner() {
        let product = minted(10);
        assert!(matches!(
            product.transfer(&y(), &x(), Utc::now()),
            Err(DomainError::NotOwner { .. })
        ));
        assert!(matches!(
            product.transfer(&x(), &x(), Utc::now()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn split_derives_lot() {
        let mut source = minted(100);
        let (source_events, lot_event) = source
            .split(ProductId::new(5), &x(), &y(), 30, Utc::now())
            .unwrap();
        source.apply_events(source_events);

        let mut lot = Product::default();
        lot.apply(lot_event);

        assert_eq!(source.quantity(), 70);
        assert_eq!(source.split_lots(), &[ProductId::new(5)]);
        assert_eq!(source.current_owner(), Some(&x()));

        assert_eq!(lot.id(), ProductId::new(5));
        assert_eq!(lot.quantity(), 30);
        assert_eq!(lot.derived_from(), Some(ProductId::new(1)));
        assert_eq!(lot.original_creator(), &x());
        assert_eq!(lot.ownership_history(), &[x(), y()]);
        assert_eq!(lot.price_per_unit(), source.price_per_unit());
        assert_eq!(source.quantity() + lot.quantity(), 100);
    }

    #[test]
    fn split_validates_quantity() {
        let product = minted(10);
        assert!(matches!(
            product.split(ProductId::new(2), &x(), &y(), 0, Utc::now()),
            Err(DomainError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            product.split(ProductId::new(2), &x(), &y(), 11, Utc::now()),
            Err(DomainError::InsufficientQuantity { .. })
        ));
        assert!(matches!(
            product.split(ProductId::new(2), &y(), &x(), 1, Utc::now()),
            Err(DomainError::NotOwner { .. })
        ));
    }

    #[test]
    fn manufacture_needs_components() {
        let product = Product::default();
        let result = product.manufacture(
            ProductId::new(2),
            &NewProduct::new("Chocolate", 10, Money::from_minor_units(5)),
            &x(),
            Vec::new(),
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }
}
