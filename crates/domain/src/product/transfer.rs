//! Ownership transfers, staged for the caller to commit.

use std::sync::Arc;

use common::{Address, Clock, ProductId};
use ledger_store::LedgerStore;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::repository::{Repository, UnitOfWork};
use crate::sequence;

use super::Product;

/// Moves products, or parts of them, between owners.
///
/// Nothing here commits. Events are staged into the caller's unit of work
/// so a transfer lands in the same transaction as whatever caused it.
/// Every call stages a new transfer; preventing repeats is up to the caller.
#[derive(Clone)]
pub struct TransferEngine<S> {
    repo: Repository<S>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> TransferEngine<S> {
    /// Creates an engine over `repo`.
    pub fn new(repo: Repository<S>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    async fn load(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.repo
            .load_existing(product_id.stream_id())
            .await?
            .ok_or(DomainError::ProductNotFound { product_id })
    }

    /// Stages the transfer of the whole product from `from` to `to`.
    ///
    /// Returns the product as it will be once the unit commits.
    #[tracing::instrument(skip(self, unit))]
    pub async fn transfer_full(
        &self,
        unit: &mut UnitOfWork,
        product_id: ProductId,
        from: &Address,
        to: &Address,
    ) -> Result<Product, DomainError> {
        let mut product = self.load(product_id).await?;
        let events = product.transfer(from, to, self.clock.now())?;
        unit.stage(product_id.stream_id(), &product, &events)?;

        product.apply_events(events);
        tracing::debug!(%product_id, %from, %to, "full transfer staged");
        Ok(product)
    }

    /// Stages splitting `quantity` units of `product_id` into a new lot owned by `to`.
    ///
    /// The lot id is allocated in the same unit. Returns the lot as it will
    /// be once the unit commits.
    #[tracing::instrument(skip(self, unit))]
    pub async fn transfer_partial(
        &self,
        unit: &mut UnitOfWork,
        product_id: ProductId,
        from: &Address,
        to: &Address,
        quantity: u64,
    ) -> Result<Product, DomainError> {
        let source = self.load(product_id).await?;
        let lot_id = ProductId::new(sequence::allocate(&self.repo, unit, ProductId::KIND).await?);

        let (source_events, lot_event) =
            source.split(lot_id, from, to, quantity, self.clock.now())?;

        let mut lot = Product::default();
        unit.stage(product_id.stream_id(), &source, &source_events)?;
        unit.stage(
            lot_id.stream_id(),
            &lot,
            std::slice::from_ref(&lot_event),
        )?;

        lot.apply(lot_event);
        tracing::debug!(%product_id, %lot_id, quantity, %from, %to, "partial transfer staged");
        Ok(lot)
    }
}
