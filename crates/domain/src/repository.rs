//! Loading records from the ledger and committing staged events.

use std::future::Future;

use common::AggregateId;
use ledger_store::{CommitReceipt, LedgerStore, StreamAppend, Transaction};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Commit attempts made before a persistent conflict is reported.
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Events staged against one or more records, committed as one transaction.
///
/// Each stream is appended at the version of the aggregate it was first
/// staged with, so a concurrent writer on any of those streams makes the
/// whole unit fail on commit.
#[derive(Debug, Default)]
pub struct UnitOfWork {
    appends: Vec<StreamAppend>,
}

impl UnitOfWork {
    /// Creates an empty unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages events for the record `aggregate` loaded from `stream_id`.
    ///
    /// Staging the same stream again continues its version sequence.
    pub fn stage<A: Aggregate>(
        &mut self,
        stream_id: AggregateId,
        aggregate: &A,
        events: &[A::Event],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let index = match self.appends.iter().position(|a| a.stream_id() == stream_id) {
            Some(index) => index,
            None => {
                self.appends.push(StreamAppend::new(
                    stream_id,
                    A::aggregate_type(),
                    aggregate.version(),
                ));
                self.appends.len() - 1
            }
        };

        let append = &mut self.appends[index];
        for event in events {
            append.push(event.event_type(), event)?;
        }
        Ok(())
    }

    /// Returns true if events are staged for `stream_id`.
    pub fn touches(&self, stream_id: AggregateId) -> bool {
        self.appends.iter().any(|a| a.stream_id() == stream_id)
    }

    /// Number of streams with staged events.
    pub fn stream_count(&self) -> usize {
        self.appends.len()
    }

    /// Returns true if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.appends.is_empty()
    }

    /// Converts the staged appends into a store transaction.
    pub fn into_transaction(self) -> Transaction {
        let mut transaction = Transaction::new();
        for append in self.appends {
            transaction.add(append);
        }
        transaction
    }
}

/// Aggregate loading and committing on top of a [`LedgerStore`].
#[derive(Clone)]
pub struct Repository<S> {
    store: S,
    max_commit_attempts: u32,
}

impl<S: LedgerStore> Repository<S> {
    /// Creates a repository over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Sets how many times a conflicting operation is re-decided. At least 1.
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the configured attempt limit.
    pub fn max_commit_attempts(&self) -> u32 {
        self.max_commit_attempts
    }

    /// Rebuilds an aggregate from its stream.
    ///
    /// A missing stream yields the default (non-existent) aggregate.
    pub async fn load<A: Aggregate>(&self, stream_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.read_stream(stream_id).await?;

        let mut aggregate = A::default();
        for stored in events {
            let event: A::Event = stored.decode()?;
            aggregate.apply(event);
            aggregate.set_version(stored.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it was never created.
    pub async fn load_existing<A: Aggregate>(
        &self,
        stream_id: AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let aggregate: A = self.load(stream_id).await?;
        Ok(aggregate.exists().then_some(aggregate))
    }

    /// Commits everything staged in `unit` atomically.
    pub async fn commit(&self, unit: UnitOfWork) -> Result<CommitReceipt, DomainError> {
        Ok(self.store.commit(unit.into_transaction()).await?)
    }

    /// Runs a load-decide-commit `attempt`, re-running it on concurrency conflicts.
    ///
    /// Each run must reload whatever it decides against. Any other error,
    /// or a conflict on the last attempt, is returned as is.
    pub async fn retry_on_conflict<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(e) if e.is_conflict() && tries < self.max_commit_attempts => {
                    tracing::debug!(operation, attempt = tries, error = %e, "retrying after conflict");
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_store::{InMemoryLedgerStore, StoreError, Version};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Opened,
        Incremented { by: u32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Opened => "Opened",
                CounterEvent::Incremented { .. } => "Incremented",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        open: bool,
        total: u32,
        version: Version,
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn exists(&self) -> bool {
            self.open
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Opened => self.open = true,
                CounterEvent::Incremented { by } => self.total += by,
            }
        }
    }

    #[tokio::test]
    async fn stage_commit_and_load() {
        let repo = Repository::new(InMemoryLedgerStore::new());
        let stream = AggregateId::new();

        let counter: Counter = repo.load(stream).await.unwrap();
        let mut unit = UnitOfWork::new();
        unit.stage(
            stream,
            &counter,
            &[CounterEvent::Opened, CounterEvent::Incremented { by: 2 }],
        )
        .unwrap();
        unit.stage(stream, &counter, &[CounterEvent::Incremented { by: 3 }])
            .unwrap();
        assert_eq!(unit.stream_count(), 1);
        repo.commit(unit).await.unwrap();

        let counter: Counter = repo.load(stream).await.unwrap();
        assert!(counter.exists());
        assert_eq!(counter.total, 5);
        assert_eq!(counter.version(), Version::new(3));
    }

    #[tokio::test]
    async fn load_existing_is_none_for_missing_stream() {
        let repo = Repository::new(InMemoryLedgerStore::new());
        let counter: Option<Counter> = repo.load_existing(AggregateId::new()).await.unwrap();
        assert!(counter.is_none());
    }

    #[tokio::test]
    async fn stale_unit_conflicts() {
        let repo = Repository::new(InMemoryLedgerStore::new());
        let stream = AggregateId::new();
        let stale: Counter = repo.load(stream).await.unwrap();

        let mut first = UnitOfWork::new();
        first.stage(stream, &stale, &[CounterEvent::Opened]).unwrap();
        repo.commit(first).await.unwrap();

        let mut second = UnitOfWork::new();
        second.stage(stream, &stale, &[CounterEvent::Opened]).unwrap();
        let err = repo.commit(second).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn retry_gives_up_after_limit() {
        let repo = Repository::new(InMemoryLedgerStore::new()).with_max_commit_attempts(3);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = repo
            .retry_on_conflict("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::Store(StoreError::ConcurrencyConflict {
                    stream_id: AggregateId::new(),
                    expected: Version::initial(),
                    actual: Version::first(),
                }))
            })
            .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_does_not_repeat_other_errors() {
        let repo = Repository::new(InMemoryLedgerStore::new());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = repo
            .retry_on_conflict("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DomainError::InvalidInput("bad".to_string()))
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
