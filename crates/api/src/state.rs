//! Shared application state.

use std::sync::Arc;

use common::Clock;
use domain::{IdentityRegistry, ProvenanceStore, Repository, TraceabilityEngine};
use ledger_store::LedgerStore;
use lifecycle::OrderLifecycleEngine;

/// Engines shared by all handlers, all backed by the same ledger store.
pub struct AppState<S> {
    pub registry: IdentityRegistry<S>,
    pub products: ProvenanceStore<S>,
    pub trace: TraceabilityEngine<S>,
    pub lifecycle: OrderLifecycleEngine<S>,
}

impl<S: LedgerStore + Clone> AppState<S> {
    /// Builds every engine over `store`.
    pub fn new(store: S, max_commit_attempts: u32, clock: Arc<dyn Clock>) -> Self {
        let repo = Repository::new(store).with_max_commit_attempts(max_commit_attempts);
        Self {
            registry: IdentityRegistry::new(repo.clone(), clock.clone()),
            products: ProvenanceStore::new(repo.clone(), clock.clone()),
            trace: TraceabilityEngine::new(repo.clone()),
            lifecycle: OrderLifecycleEngine::new(repo, clock),
        }
    }
}
