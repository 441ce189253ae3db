//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Address, Money, OrderId, ProductId};
use ledger_store::Version;

use crate::aggregate::Aggregate;
use crate::error::DomainError;

use super::{
    Deadline, DeliveryEvent, OrderEvent, OrderStatus, OrderType, events::OrderCreatedData,
};

/// Negotiated terms of a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerms {
    pub buyer: Address,
    pub seller: Address,

    /// The product sold, or for a partial order the product it is split from.
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

/// Order aggregate root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    id: OrderId,
    version: Version,
    buyer: Address,
    seller: Address,
    product_id: ProductId,
    quantity: u64,
    unit_price: Money,
    total_price: Money,
    order_type: Option<OrderType>,
    status: OrderStatus,
    created_at: Option<DateTime<Utc>>,
    approval_deadline: Option<DateTime<Utc>>,
    payment_deadline: Option<DateTime<Utc>>,
    notes: String,
    delivery_events: Vec<DeliveryEvent>,
    exists: bool,
    original_product_id: Option<ProductId>,
    listing_id: Option<String>,
}

impl Aggregate for Order {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "Order"
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
            OrderEvent::OrderCreated(data) => self.apply_order_created(data),
            OrderEvent::DeliveryRecorded(data) => {
                self.status = data.event.status;
                self.delivery_events.push(data.event);
                if let Some(product_id) = data.settled_product_id {
                    self.product_id = product_id;
                }
            }
        }
    }
}

impl Order {
    fn apply_order_created(&mut self, data: OrderCreatedData) {
        self.id = data.order_id;
        self.buyer = data.buyer;
        self.seller = data.seller;
        self.product_id = data.product_id;
        self.quantity = data.quantity;
        self.unit_price = data.unit_price;
        self.total_price = data
            .unit_price
            .checked_mul(data.quantity)
            .unwrap_or_default();
        self.order_type = Some(data.order_type);
        self.status = OrderStatus::Created;
        self.created_at = Some(data.created_at);
        self.approval_deadline = Some(data.approval_deadline);
        self.payment_deadline = Some(data.payment_deadline);
        self.notes = data.notes;
        self.original_product_id =
            (data.order_type == OrderType::PartialQuantity).then_some(data.product_id);
        self.listing_id = data.listing_id;
        self.exists = true;
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn buyer(&self) -> &Address {
        &self.buyer
    }

    pub fn seller(&self) -> &Address {
        &self.seller
    }

    /// The product sold. For a settled partial order, the derived lot.
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Quantity times unit price.
    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type.unwrap_or(OrderType::FullProduct)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn approval_deadline(&self) -> Option<DateTime<Utc>> {
        self.approval_deadline
    }

    pub fn payment_deadline(&self) -> Option<DateTime<Utc>> {
        self.payment_deadline
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn delivery_events(&self) -> &[DeliveryEvent] {
        &self.delivery_events
    }

    pub fn is_partial_transfer(&self) -> bool {
        self.order_type == Some(OrderType::PartialQuantity)
    }

    /// The product a partial order is split from.
    pub fn original_product_id(&self) -> Option<ProductId> {
        self.original_product_id
    }

    pub fn listing_id(&self) -> Option<&str> {
        self.listing_id.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the instant of `deadline`.
    pub fn deadline_at(&self, deadline: Deadline) -> Option<DateTime<Utc>> {
        match deadline {
            Deadline::Approval => self.approval_deadline,
            Deadline::Payment => self.payment_deadline,
        }
    }

    /// Returns the deadline that has passed at `now` and forces the order
    /// out of its current status, if any.
    ///
    /// A deadline has passed only when `now` is strictly later than it.
    pub fn overdue(&self, now: DateTime<Utc>) -> Option<Deadline> {
        let deadline = match self.status.expiry()? {
            OrderStatus::ExpiredUnapproved => Deadline::Approval,
            _ => Deadline::Payment,
        };
        let at = self.deadline_at(deadline)?;
        (now > at).then_some(deadline)
    }
}

// Command methods (return events)
impl Order {
    /// Places the order.
    pub fn create(&self, id: OrderId, terms: &OrderTerms) -> Result<Vec<OrderEvent>, DomainError> {
        if self.exists {
            return Err(DomainError::InvalidInput(format!("order {id} already exists")));
        }
        if terms.buyer == terms.seller {
            return Err(DomainError::InvalidInput(format!(
                "buyer and seller must differ (both {})",
                terms.buyer
            )));
        }
        if terms.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: terms.quantity,
                reason: "order quantity must be greater than 0",
            });
        }
        if !terms.unit_price.is_positive() {
            return Err(DomainError::InvalidPrice {
                price: terms.unit_price,
                reason: "unit price must be greater than 0",
            });
        }
        if terms.approval_deadline <= terms.created_at {
            return Err(DomainError::InvalidDeadlines(format!(
                "approval deadline {} must be after creation time {}",
                terms.approval_deadline, terms.created_at
            )));
        }
        if terms.payment_deadline <= terms.approval_deadline {
            return Err(DomainError::InvalidDeadlines(format!(
                "payment deadline {} must be after approval deadline {}",
                terms.payment_deadline, terms.approval_deadline
            )));
        }
        if terms.unit_price.checked_mul(terms.quantity).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "total price of {} x {} overflows",
                terms.quantity, terms.unit_price
            )));
        }

        Ok(vec![OrderEvent::OrderCreated(OrderCreatedData {
            order_id: id,
            buyer: terms.buyer.clone(),
            seller: terms.seller.clone(),
            product_id: terms.product_id,
            quantity: terms.quantity,
            unit_price: terms.unit_price,
            order_type: terms.order_type,
            created_at: terms.created_at,
            approval_deadline: terms.approval_deadline,
            payment_deadline: terms.payment_deadline,
            notes: terms.notes.clone(),
            listing_id: terms.listing_id.clone(),
        })])
    }

    /// Records the next delivery milestone.
    ///
    /// `settled_product_id` names the product that changes hands when the
    /// milestone settles the order.
    pub fn record(
        &self,
        status: OrderStatus,
        description: &str,
        updated_by: &Address,
        now: DateTime<Utc>,
        settled_product_id: Option<ProductId>,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists()?;
        if !self.status.can_advance_to(status) {
            return Err(DomainError::InvalidTransition {
                order_id: self.id,
                from: self.status,
                to: status,
            });
        }

        Ok(vec![OrderEvent::delivery_recorded(
            DeliveryEvent {
                timestamp: now,
                status,
                description: description.to_string(),
                updated_by: Some(updated_by.clone()),
            },
            settled_product_id,
        )])
    }

    /// Forces the order into the terminal status of `deadline`.
    pub fn expire(
        &self,
        deadline: Deadline,
        updated_by: Option<&Address>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        self.ensure_exists()?;
        let expiry = deadline.expiry_status();
        if self.status.expiry() != Some(expiry) {
            return Err(DomainError::InvalidTransition {
                order_id: self.id,
                from: self.status,
                to: expiry,
            });
        }

        Ok(vec![OrderEvent::delivery_recorded(
            DeliveryEvent {
                timestamp: now,
                status: expiry,
                description: format!("{deadline} deadline passed"),
                updated_by: updated_by.cloned(),
            },
            None,
        )])
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.exists {
            return Err(DomainError::OrderNotFound { order_id: self.id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn terms(now: DateTime<Utc>) -> OrderTerms {
        OrderTerms {
            buyer: Address::new("0xY"),
            seller: Address::new("0xX"),
            product_id: ProductId::new(2),
            quantity: 10,
            unit_price: Money::from_minor_units(250),
            order_type: OrderType::FullProduct,
            created_at: now,
            approval_deadline: now + Duration::days(1),
            payment_deadline: now + Duration::days(2),
            notes: String::new(),
            listing_id: None,
        }
    }

    fn created(now: DateTime<Utc>) -> Order {
        let mut order = Order::default();
        let events = order.create(OrderId::new(1), &terms(now)).unwrap();
        order.apply_events(events);
        order
    }

    #[test]
    fn create_computes_total() {
        let order = created(Utc::now());
        assert!(order.exists());
        assert_eq!(order.status(), OrderStatus::Created);
        assert_eq!(order.total_price(), Money::from_minor_units(2500));
        assert!(order.delivery_events().is_empty());
        assert!(!order.is_partial_transfer());
        assert_eq!(order.original_product_id(), None);
    }

    #[test]
    fn create_validates_terms() {
        let now = Utc::now();
        let order = Order::default();

        let mut same_party = terms(now);
        same_party.buyer = same_party.seller.clone();
        assert!(matches!(
            order.create(OrderId::new(1), &same_party),
            Err(DomainError::InvalidInput(_))
        ));

        let mut free = terms(now);
        free.unit_price = Money::zero();
        assert!(matches!(
            order.create(OrderId::new(1), &free),
            Err(DomainError::InvalidPrice { .. })
        ));

        let mut swapped = terms(now);
        swapped.payment_deadline = swapped.approval_deadline;
        assert!(matches!(
            order.create(OrderId::new(1), &swapped),
            Err(DomainError::InvalidDeadlines(_))
        ));

        let mut past = terms(now);
        past.approval_deadline = now;
        assert!(matches!(
            order.create(OrderId::new(1), &past),
            Err(DomainError::InvalidDeadlines(_))
        ));

        let mut huge = terms(now);
        huge.unit_price = Money::from_minor_units(i64::MAX);
        assert!(matches!(
            order.create(OrderId::new(1), &huge),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn partial_order_keeps_original_product() {
        let now = Utc::now();
        let mut partial = terms(now);
        partial.order_type = OrderType::PartialQuantity;

        let mut order = Order::default();
        order.apply_events(order.create(OrderId::new(1), &partial).unwrap());
        assert!(order.is_partial_transfer());
        assert_eq!(order.original_product_id(), Some(ProductId::new(2)));

        let seller = Address::new("0xX");
        for status in [
            OrderStatus::Approved,
            OrderStatus::Packed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::QualityChecked,
        ] {
            let events = order.record(status, "", &seller, now, None).unwrap();
            order.apply_events(events);
        }
        let events = order
            .record(
                OrderStatus::PaymentSent,
                "paid",
                &Address::new("0xY"),
                now,
                Some(ProductId::new(7)),
            )
            .unwrap();
        order.apply_events(events);

        assert_eq!(order.product_id(), ProductId::new(7));
        assert_eq!(order.original_product_id(), Some(ProductId::new(2)));
        assert_eq!(order.status(), OrderStatus::PaymentSent);
    }

    #[test]
    fn record_rejects_skips() {
        let now = Utc::now();
        let order = created(now);
        let result = order.record(OrderStatus::Packed, "", &Address::new("0xX"), now, None);
        assert!(matches!(
            result,
            Err(DomainError::InvalidTransition {
                from: OrderStatus::Created,
                to: OrderStatus::Packed,
                ..
            })
        ));
    }

    #[test]
    fn overdue_uses_strict_comparison() {
        let now = Utc::now();
        let order = created(now);
        let deadline = now + Duration::days(1);

        assert_eq!(order.overdue(deadline), None);
        assert_eq!(
            order.overdue(deadline + Duration::seconds(1)),
            Some(Deadline::Approval)
        );
    }

    #[test]
    fn expire_moves_to_terminal_status() {
        let now = Utc::now();
        let mut order = created(now);

        assert!(order.expire(Deadline::Payment, None, now).is_err());

        let events = order.expire(Deadline::Approval, None, now).unwrap();
        order.apply_events(events);
        assert_eq!(order.status(), OrderStatus::ExpiredUnapproved);
        assert!(order.is_terminal());
        assert_eq!(order.delivery_events().len(), 1);
        assert_eq!(order.delivery_events()[0].updated_by, None);
    }
}
