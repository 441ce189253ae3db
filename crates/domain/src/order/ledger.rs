//! Order records: reads and staging of order events.

use common::OrderId;
use ledger_store::LedgerStore;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::repository::{Repository, UnitOfWork};
use crate::sequence;

use super::{DeliveryEvent, Order, OrderEvent, OrderTerms};

/// Append-only store of orders and their delivery history.
///
/// Writes are only staged here; the lifecycle engine decides when to
/// commit and what else goes into the same transaction.
#[derive(Clone)]
pub struct OrderLedger<S> {
    repo: Repository<S>,
}

impl<S: LedgerStore> OrderLedger<S> {
    pub fn new(repo: Repository<S>) -> Self {
        Self { repo }
    }

    /// Returns the order, or None if it was never created.
    pub async fn find(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        self.repo.load_existing(order_id.stream_id()).await
    }

    /// Returns the order, failing with [`DomainError::OrderNotFound`].
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.find(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound { order_id })
    }

    /// Returns the recorded milestones of the order, oldest first.
    pub async fn get_delivery_history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<DeliveryEvent>, DomainError> {
        Ok(self.get_order(order_id).await?.delivery_events().to_vec())
    }

    /// Allocates an order id and stages the creation of the order.
    ///
    /// Returns the order as it will be once the unit commits.
    pub async fn stage_creation(
        &self,
        unit: &mut UnitOfWork,
        terms: &OrderTerms,
    ) -> Result<Order, DomainError> {
        let id = OrderId::new(sequence::allocate(&self.repo, unit, OrderId::KIND).await?);
        let mut order: Order = self.repo.load(id.stream_id()).await?;
        let events = order.create(id, terms)?;
        unit.stage(id.stream_id(), &order, &events)?;

        order.apply_events(events);
        Ok(order)
    }

    /// Stages `events` decided against `order` and returns the updated order.
    pub fn stage_events(
        &self,
        unit: &mut UnitOfWork,
        order: &Order,
        events: Vec<OrderEvent>,
    ) -> Result<Order, DomainError> {
        unit.stage(order.id().stream_id(), order, &events)?;

        let mut updated = order.clone();
        updated.apply_events(events);
        Ok(updated)
    }
}
