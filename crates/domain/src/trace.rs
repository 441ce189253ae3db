//! Read-only walks over the provenance graph.
//!
//! Backward walks follow composition edges and derived-lot links toward raw
//! materials. Forward walks follow the consumption and split links recorded
//! on each product.

use std::collections::{HashSet, VecDeque};

use common::{Address, ProductId};
use ledger_store::LedgerStore;

use crate::error::DomainError;
use crate::product::{ComponentEdge, Product};
use crate::repository::Repository;

enum Step {
    Enter(ProductId),
    Supplier(Address),
    Exit(ProductId),
}

/// Answers provenance queries against the product records.
#[derive(Clone)]
pub struct TraceabilityEngine<S> {
    repo: Repository<S>,
}

impl<S: LedgerStore> TraceabilityEngine<S> {
    /// Creates an engine over `repo`.
    pub fn new(repo: Repository<S>) -> Self {
        Self { repo }
    }

    async fn load(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.repo
            .load_existing(product_id.stream_id())
            .await?
            .ok_or(DomainError::ProductNotFound { product_id })
    }

    /// Returns every identity that contributed to `product_id`, in the order
    /// a depth-first walk first meets them.
    ///
    /// A product contributes its original creator when entered; each edge
    /// contributes its supplier and then everything behind it. Products
    /// reachable along several paths are walked once. Re-entering a product
    /// that is still on the current path fails with
    /// [`DomainError::TraceabilityCycleDetected`].
    #[tracing::instrument(skip(self))]
    pub async fn ancestors(&self, product_id: ProductId) -> Result<Vec<Address>, DomainError> {
        let mut identities = Vec::new();
        let mut seen_identities = HashSet::new();
        let mut on_path = HashSet::new();
        let mut done = HashSet::new();
        let mut stack = vec![Step::Enter(product_id)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    if on_path.contains(&id) {
                        tracing::warn!(product_id = %id, "composition cycle in stored graph");
                        return Err(DomainError::TraceabilityCycleDetected { product_id: id });
                    }
                    if done.contains(&id) {
                        continue;
                    }

                    let product = self.load(id).await?;
                    on_path.insert(id);
                    if seen_identities.insert(product.original_creator().clone()) {
                        identities.push(product.original_creator().clone());
                    }

                    stack.push(Step::Exit(id));
                    let mut next = Vec::with_capacity(product.components().len() * 2 + 1);
                    for edge in product.components() {
                        next.push(Step::Supplier(edge.supplier.clone()));
                        next.push(Step::Enter(edge.product_id));
                    }
                    if let Some(source) = product.derived_from() {
                        next.push(Step::Enter(source));
                    }
                    stack.extend(next.into_iter().rev());
                }
                Step::Supplier(address) => {
                    if seen_identities.insert(address.clone()) {
                        identities.push(address);
                    }
                }
                Step::Exit(id) => {
                    on_path.remove(&id);
                    done.insert(id);
                }
            }
        }

        metrics::histogram!("traceability_walk_products").record(done.len() as f64);
        Ok(identities)
    }

    /// Returns the direct composition edges of `product_id`.
    ///
    /// A derived lot shares the bill of materials of the product it was split
    /// from, so its edges are those of the first non-derived product up its
    /// lineage.
    pub async fn composition_tree(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ComponentEdge>, DomainError> {
        let mut product = self.load(product_id).await?;
        let mut visited = HashSet::from([product_id]);

        while let Some(source) = product.derived_from() {
            if !visited.insert(source) {
                return Err(DomainError::TraceabilityCycleDetected { product_id: source });
            }
            product = self.load(source).await?;
        }

        Ok(product.components().to_vec())
    }

    /// Returns every product built from or split off `product_id`, breadth first.
    #[tracing::instrument(skip(self))]
    pub async fn descendants(&self, product_id: ProductId) -> Result<Vec<ProductId>, DomainError> {
        let start = self.load(product_id).await?;

        let mut visited = HashSet::from([product_id]);
        let mut queue: VecDeque<ProductId> = VecDeque::new();
        let mut result = Vec::new();

        for next in start.consumed_by().iter().chain(start.split_lots()) {
            if visited.insert(*next) {
                queue.push_back(*next);
            }
        }

        while let Some(id) = queue.pop_front() {
            result.push(id);
            let product = self.load(id).await?;
            for next in product.consumed_by().iter().chain(product.split_lots()) {
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }

        metrics::histogram!("traceability_walk_products").record(visited.len() as f64);
        Ok(result)
    }

    /// Returns `product_id` followed by each product it was split from, up to the root lot.
    pub async fn lot_lineage(&self, product_id: ProductId) -> Result<Vec<ProductId>, DomainError> {
        let mut lineage = vec![product_id];
        let mut product = self.load(product_id).await?;

        while let Some(source) = product.derived_from() {
            if lineage.contains(&source) {
                return Err(DomainError::TraceabilityCycleDetected { product_id: source });
            }
            lineage.push(source);
            product = self.load(source).await?;
        }

        Ok(lineage)
    }

    /// Returns true if `target` is `from` or lies behind it in the graph.
    ///
    /// Products that do not exist yet are treated as leaves.
    pub async fn reaches(&self, from: ProductId, target: ProductId) -> Result<bool, DomainError> {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if id == target {
                return Ok(true);
            }
            if !visited.insert(id) {
                continue;
            }

            let product: Option<Product> = self.repo.load_existing(id.stream_id()).await?;
            if let Some(product) = product {
                stack.extend(product.components().iter().map(|edge| edge.product_id));
                stack.extend(product.derived_from());
            }
        }

        Ok(false)
    }
}
