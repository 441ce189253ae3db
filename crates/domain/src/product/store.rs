//! Provenance graph store: creation and lookup of product nodes.

use std::sync::Arc;

use common::{Address, Clock, ProductId};
use ledger_store::LedgerStore;

use crate::aggregate::Aggregate;
use crate::company::IdentityRegistry;
use crate::error::DomainError;
use crate::repository::{Repository, UnitOfWork};
use crate::sequence;
use crate::trace::TraceabilityEngine;

use super::{ComponentEdge, ComponentSpec, NewProduct, Product};

/// Creates products and serves product reads.
///
/// A manufacture writes the new node, its complete edge set and the stock
/// consumption of every component in one transaction.
#[derive(Clone)]
pub struct ProvenanceStore<S> {
    repo: Repository<S>,
    registry: IdentityRegistry<S>,
    trace: TraceabilityEngine<S>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore + Clone> ProvenanceStore<S> {
    /// Creates a store over `repo`.
    pub fn new(repo: Repository<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: IdentityRegistry::new(repo.clone(), clock.clone()),
            trace: TraceabilityEngine::new(repo.clone()),
            repo,
            clock,
        }
    }

    /// Mints a raw product owned by `creator`.
    #[tracing::instrument(skip(self, spec), fields(name = %spec.name, quantity = spec.quantity))]
    pub async fn mint(&self, spec: NewProduct, creator: &Address) -> Result<Product, DomainError> {
        self.registry.require_active(creator).await?;

        let product = self
            .repo
            .retry_on_conflict("mint", || self.try_mint(&spec, creator))
            .await?;

        metrics::counter!("products_minted_total").increment(1);
        tracing::info!(product_id = %product.id(), %creator, "product minted");
        Ok(product)
    }

    async fn try_mint(&self, spec: &NewProduct, creator: &Address) -> Result<Product, DomainError> {
        let mut unit = UnitOfWork::new();
        let id = ProductId::new(sequence::allocate(&self.repo, &mut unit, ProductId::KIND).await?);

        let mut product: Product = self.repo.load(id.stream_id()).await?;
        let events = product.mint(id, spec, creator, self.clock.now())?;
        unit.stage(id.stream_id(), &product, &events)?;
        self.repo.commit(unit).await?;

        product.apply_events(events);
        Ok(product)
    }

    /// Manufactures a product from existing components.
    ///
    /// Quantities requested from the same component are summed before the
    /// stock check. Nothing is written unless every component passes.
    #[tracing::instrument(skip(self, spec, components), fields(name = %spec.name, components = components.len()))]
    pub async fn manufacture(
        &self,
        spec: NewProduct,
        components: Vec<ComponentSpec>,
        creator: &Address,
    ) -> Result<Product, DomainError> {
        if components.is_empty() {
            return Err(DomainError::InvalidInput(
                "a manufactured product needs at least one component".to_string(),
            ));
        }
        if components.iter().any(|c| c.quantity_used == 0) {
            return Err(DomainError::InvalidQuantity {
                quantity: 0,
                reason: "component quantity must be greater than 0",
            });
        }
        self.registry.require_active(creator).await?;

        let product = self
            .repo
            .retry_on_conflict("manufacture", || {
                self.try_manufacture(&spec, &components, creator)
            })
            .await?;

        metrics::counter!("products_manufactured_total").increment(1);
        tracing::info!(
            product_id = %product.id(),
            %creator,
            components = product.components().len(),
            "product manufactured"
        );
        Ok(product)
    }

    async fn try_manufacture(
        &self,
        spec: &NewProduct,
        components: &[ComponentSpec],
        creator: &Address,
    ) -> Result<Product, DomainError> {
        let mut unit = UnitOfWork::new();
        let id = ProductId::new(sequence::allocate(&self.repo, &mut unit, ProductId::KIND).await?);
        let now = self.clock.now();

        // Distinct components in first-mention order, with summed quantities.
        let mut consumed: Vec<(Product, u64)> = Vec::new();
        let mut edges = Vec::with_capacity(components.len());

        for component in components {
            let position = consumed
                .iter()
                .position(|(p, _)| p.id() == component.product_id);
            let index = match position {
                Some(index) => index,
                None => {
                    let product: Product = self
                        .repo
                        .load_existing(component.product_id.stream_id())
                        .await?
                        .ok_or(DomainError::ComponentNotFound {
                            product_id: component.product_id,
                        })?;
                    if self.trace.reaches(component.product_id, id).await? {
                        return Err(DomainError::CyclicComposition {
                            product_id: id,
                            component_id: component.product_id,
                        });
                    }
                    consumed.push((product, 0));
                    consumed.len() - 1
                }
            };

            let (product, total) = &mut consumed[index];
            if !product.is_owned_by(&component.supplier) {
                return Err(DomainError::NotOwner {
                    product_id: component.product_id,
                    claimed: component.supplier.to_string(),
                    owner: product
                        .current_owner()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                });
            }

            *total = total.saturating_add(component.quantity_used);
            if *total > product.quantity() {
                return Err(DomainError::InsufficientComponentQuantity {
                    product_id: component.product_id,
                    requested: *total,
                    available: product.quantity(),
                });
            }

            edges.push(ComponentEdge {
                product_id: component.product_id,
                quantity_used: component.quantity_used,
                supplier: component.supplier.clone(),
                timestamp: now,
            });
        }

        let mut product: Product = self.repo.load(id.stream_id()).await?;
        let events = product.manufacture(id, spec, creator, edges, now)?;
        unit.stage(id.stream_id(), &product, &events)?;

        for (component, total) in &consumed {
            let consumption = component.consume(*total, id, now)?;
            unit.stage(component.id().stream_id(), component, &consumption)?;
        }

        self.repo.commit(unit).await?;

        product.apply_events(events);
        Ok(product)
    }

    /// Returns the product, or None if it does not exist.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<Product>, DomainError> {
        self.repo.load_existing(product_id.stream_id()).await
    }

    /// Returns the product, failing with [`DomainError::ProductNotFound`].
    pub async fn require(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.get(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound { product_id })
    }
}
