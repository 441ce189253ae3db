//! Order lifecycle engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Address, Clock, OrderId, ProductId};
use domain::{
    Deadline, DeliveryEvent, DomainError, IdentityRegistry, Order, OrderLedger, OrderStatus,
    OrderTerms, ProvenanceStore, Repository, TransferEngine, UnitOfWork,
};
use ledger_store::LedgerStore;

use crate::outcome::{DeadlineExceeded, EventOutcome};
use crate::request::{NewOrder, OrderDetails, OrderSubject};

/// Drives orders from creation to settlement or expiry.
///
/// Every write is a load-decide-commit cycle that is re-run when another
/// writer got there first, so a racing milestone is re-validated against
/// the status that won.
#[derive(Clone)]
pub struct OrderLifecycleEngine<S> {
    repo: Repository<S>,
    registry: IdentityRegistry<S>,
    products: ProvenanceStore<S>,
    transfers: TransferEngine<S>,
    orders: OrderLedger<S>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore + Clone> OrderLifecycleEngine<S> {
    /// Creates an engine over `repo`, reading time from `clock`.
    pub fn new(repo: Repository<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: IdentityRegistry::new(repo.clone(), clock.clone()),
            products: ProvenanceStore::new(repo.clone(), clock.clone()),
            transfers: TransferEngine::new(repo.clone(), clock.clone()),
            orders: OrderLedger::new(repo.clone()),
            repo,
            clock,
        }
    }

    /// Places an order of `request.seller`'s product for `request.buyer`.
    #[tracing::instrument(skip(self, request), fields(buyer = %request.buyer, seller = %request.seller, product_id = %request.subject.product_id()))]
    pub async fn create_order(&self, request: NewOrder) -> Result<Order, DomainError> {
        if request.buyer == request.seller {
            return Err(DomainError::InvalidInput(format!(
                "buyer and seller must differ (both {})",
                request.buyer
            )));
        }
        self.registry.require_active(&request.buyer).await?;
        self.registry.require_active(&request.seller).await?;

        let order = self
            .repo
            .retry_on_conflict("create_order", || self.try_create(&request))
            .await?;

        metrics::counter!("orders_created_total", "order_type" => order.order_type().as_str())
            .increment(1);
        tracing::info!(
            order_id = %order.id(),
            quantity = order.quantity(),
            total_price = %order.total_price(),
            "order created"
        );
        Ok(order)
    }

    async fn try_create(&self, request: &NewOrder) -> Result<Order, DomainError> {
        let product = self.products.require(request.subject.product_id()).await?;
        if !product.is_owned_by(&request.seller) {
            return Err(DomainError::NotOwner {
                product_id: product.id(),
                claimed: request.seller.to_string(),
                owner: product
                    .current_owner()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            });
        }

        let quantity = match request.subject {
            OrderSubject::FullProduct { .. } => product.quantity(),
            OrderSubject::PartialQuantity { quantity, .. } => quantity,
        };
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity,
                reason: "order quantity must be greater than 0",
            });
        }
        if quantity > product.quantity() {
            return Err(DomainError::InsufficientQuantity {
                product_id: product.id(),
                requested: quantity,
                available: product.quantity(),
            });
        }

        let terms = OrderTerms {
            buyer: request.buyer.clone(),
            seller: request.seller.clone(),
            product_id: product.id(),
            quantity,
            unit_price: request.unit_price,
            order_type: request.subject.order_type(),
            created_at: self.clock.now(),
            approval_deadline: request.approval_deadline,
            payment_deadline: request.payment_deadline,
            notes: request.notes.clone(),
            listing_id: request.listing_id.clone(),
        };

        let mut unit = UnitOfWork::new();
        let order = self.orders.stage_creation(&mut unit, &terms).await?;
        self.repo.commit(unit).await?;
        Ok(order)
    }

    /// Records the next delivery milestone of an order.
    ///
    /// If the deadline governing `status` has passed, the order is expired
    /// instead and [`EventOutcome::Expired`] is returned. Recording
    /// `payment_sent` transfers the product to the buyer atomically with
    /// the order event.
    #[tracing::instrument(skip(self, description))]
    pub async fn record_event(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        description: &str,
        updated_by: &Address,
    ) -> Result<EventOutcome, DomainError> {
        self.registry.require(updated_by).await?;

        let outcome = self
            .repo
            .retry_on_conflict("record_event", || {
                self.try_record(order_id, status, description, updated_by)
            })
            .await?;

        match &outcome {
            EventOutcome::Recorded(order) => {
                metrics::counter!("order_events_recorded_total", "status" => status.as_str())
                    .increment(1);
                if status == OrderStatus::PaymentSent {
                    metrics::counter!("ownership_transfers_total").increment(1);
                    tracing::info!(
                        %order_id,
                        product_id = %order.product_id(),
                        buyer = %order.buyer(),
                        "order settled"
                    );
                } else {
                    tracing::info!(%order_id, %status, "order event recorded");
                }
            }
            EventOutcome::Expired(exceeded, _) => self.record_expiry(exceeded),
        }
        Ok(outcome)
    }

    async fn try_record(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        description: &str,
        updated_by: &Address,
    ) -> Result<EventOutcome, DomainError> {
        let order = self.orders.get_order(order_id).await?;
        if !order.status().can_advance_to(status) {
            return Err(DomainError::InvalidTransition {
                order_id,
                from: order.status(),
                to: status,
            });
        }

        let now = self.clock.now();
        if let Some(deadline) = Deadline::governing(status)
            && let Some(deadline_at) = order.deadline_at(deadline)
            && now > deadline_at
        {
            return self.expire(&order, deadline, Some(updated_by), now).await;
        }

        let mut unit = UnitOfWork::new();
        let settled_product_id = if status == OrderStatus::PaymentSent {
            Some(self.stage_settlement(&mut unit, &order).await?)
        } else {
            None
        };

        let events = order.record(status, description, updated_by, now, settled_product_id)?;
        let order = self.orders.stage_events(&mut unit, &order, events)?;
        self.repo.commit(unit).await?;
        Ok(EventOutcome::Recorded(order))
    }

    /// Stages the transfer that settles `order` and returns the product
    /// that changes hands.
    async fn stage_settlement(
        &self,
        unit: &mut UnitOfWork,
        order: &Order,
    ) -> Result<ProductId, DomainError> {
        if order.is_partial_transfer() {
            let lot = self
                .transfers
                .transfer_partial(
                    unit,
                    order.product_id(),
                    order.seller(),
                    order.buyer(),
                    order.quantity(),
                )
                .await?;
            return Ok(lot.id());
        }

        // Stock may have been consumed since the order was placed.
        let product = self.products.require(order.product_id()).await?;
        if product.quantity() < order.quantity() {
            return Err(DomainError::InsufficientQuantity {
                product_id: product.id(),
                requested: order.quantity(),
                available: product.quantity(),
            });
        }

        self.transfers
            .transfer_full(unit, product.id(), order.seller(), order.buyer())
            .await?;
        Ok(product.id())
    }

    async fn expire(
        &self,
        order: &Order,
        deadline: Deadline,
        updated_by: Option<&Address>,
        now: DateTime<Utc>,
    ) -> Result<EventOutcome, DomainError> {
        let events = order.expire(deadline, updated_by, now)?;

        let mut unit = UnitOfWork::new();
        let order = self.orders.stage_events(&mut unit, order, events)?;
        self.repo.commit(unit).await?;

        let exceeded = DeadlineExceeded {
            order_id: order.id(),
            deadline,
            deadline_at: order.deadline_at(deadline).unwrap_or(now),
            resulting_status: order.status(),
        };
        Ok(EventOutcome::Expired(exceeded, order))
    }

    fn record_expiry(&self, exceeded: &DeadlineExceeded) {
        metrics::counter!("orders_expired_total", "deadline" => exceeded.deadline.as_str())
            .increment(1);
        tracing::warn!(
            order_id = %exceeded.order_id,
            deadline = %exceeded.deadline,
            deadline_at = %exceeded.deadline_at,
            status = %exceeded.resulting_status,
            "order expired"
        );
    }

    /// Expires the order if a deadline it is waiting on has passed.
    ///
    /// Returns None when nothing was due.
    #[tracing::instrument(skip(self))]
    pub async fn check_deadlines(
        &self,
        order_id: OrderId,
    ) -> Result<Option<EventOutcome>, DomainError> {
        let outcome = self
            .repo
            .retry_on_conflict("check_deadlines", || self.try_check_deadlines(order_id))
            .await?;

        if let Some(EventOutcome::Expired(exceeded, _)) = &outcome {
            self.record_expiry(exceeded);
        }
        Ok(outcome)
    }

    async fn try_check_deadlines(
        &self,
        order_id: OrderId,
    ) -> Result<Option<EventOutcome>, DomainError> {
        let order = self.orders.get_order(order_id).await?;
        let now = self.clock.now();
        match order.overdue(now) {
            Some(deadline) => Ok(Some(self.expire(&order, deadline, None, now).await?)),
            None => Ok(None),
        }
    }

    /// Returns the order, failing with [`DomainError::OrderNotFound`].
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.orders.get_order(order_id).await
    }

    /// Returns the recorded milestones of the order, oldest first.
    pub async fn get_delivery_history(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.orders.get_delivery_history(order_id).await
    }

    /// Returns the order with its product and both parties resolved.
    pub async fn order_details(&self, order_id: OrderId) -> Result<OrderDetails, DomainError> {
        let order = self.orders.get_order(order_id).await?;
        let product = self.products.get(order.product_id()).await?;
        let buyer = self.registry.lookup(order.buyer()).await?;
        let seller = self.registry.lookup(order.seller()).await?;

        Ok(OrderDetails {
            order,
            product,
            buyer,
            seller,
        })
    }
}
