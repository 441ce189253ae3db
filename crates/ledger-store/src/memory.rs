use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, Result, StoreError, StoredEvent, Version,
    store::{CommitReceipt, LedgerStore, Transaction},
};

#[derive(Default)]
struct MemoryState {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
}

impl MemoryState {
    fn version_of(&self, stream_id: AggregateId) -> Version {
        self.streams
            .get(&stream_id)
            .and_then(|events| events.last())
            .map(|e| e.version)
            .unwrap_or(Version::initial())
    }
}

/// In-memory ledger store.
///
/// Commits take a single write lock, so a transaction is checked and applied
/// without any reader observing a partial result.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryLedgerStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.streams.values().map(Vec::len).sum()
    }

    /// Returns the number of non-empty streams.
    pub async fn stream_count(&self) -> usize {
        self.state.read().await.streams.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    #[tracing::instrument(skip(self, transaction), fields(transaction_id = %transaction.id()))]
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt> {
        transaction.validate()?;

        let transaction_id = transaction.id();
        let mut state = self.state.write().await;

        for append in transaction.appends() {
            let actual = state.version_of(append.stream_id());
            if actual != append.expected_version() {
                metrics::counter!("ledger_commit_conflicts_total").increment(1);
                tracing::debug!(
                    stream_id = %append.stream_id(),
                    expected = %append.expected_version(),
                    %actual,
                    "commit rejected"
                );
                return Err(StoreError::ConcurrencyConflict {
                    stream_id: append.stream_id(),
                    expected: append.expected_version(),
                    actual,
                });
            }
        }

        let mut versions = Vec::with_capacity(transaction.appends().len());
        for append in transaction.into_appends() {
            versions.push((append.stream_id(), append.last_version()));
            let stream_id = append.stream_id();
            state
                .streams
                .entry(stream_id)
                .or_default()
                .extend(append.into_events());
        }

        metrics::counter!("ledger_commits_total").increment(1);

        Ok(CommitReceipt {
            transaction_id,
            versions,
        })
    }

    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>> {
        let state = self.state.read().await;
        Ok(state.streams.get(&stream_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamAppend;

    fn append(stream_id: AggregateId, expected: Version, types: &[&str]) -> StreamAppend {
        let mut append = StreamAppend::new(stream_id, "Test", expected);
        for event_type in types {
            append
                .push(*event_type, &serde_json::json!({ "type": event_type }))
                .unwrap();
        }
        append
    }

    async fn commit_one(store: &InMemoryLedgerStore, append: StreamAppend) -> Result<Version> {
        let stream_id = append.stream_id();
        let mut tx = Transaction::new();
        tx.add(append);
        let receipt = store.commit(tx).await?;
        Ok(receipt.version_of(stream_id).unwrap_or_default())
    }

    #[tokio::test]
    async fn commit_and_read_stream() {
        let store = InMemoryLedgerStore::new();
        let stream = AggregateId::new();

        let version = commit_one(&store, append(stream, Version::initial(), &["A", "B"]))
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let events = store.read_stream(stream).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "A");
        assert_eq!(events[1].version, Version::new(2));
    }

    #[tokio::test]
    async fn stale_expected_version_conflicts() {
        let store = InMemoryLedgerStore::new();
        let stream = AggregateId::new();

        commit_one(&store, append(stream, Version::initial(), &["A"]))
            .await
            .unwrap();

        let result = commit_one(&store, append(stream, Version::initial(), &["B"])).await;

        match result {
            Err(StoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::initial());
                assert_eq!(actual, Version::first());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conflicting_transaction_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let fresh = AggregateId::new();
        let busy = AggregateId::new();

        commit_one(&store, append(busy, Version::initial(), &["A"]))
            .await
            .unwrap();

        let mut tx = Transaction::new();
        tx.add(append(fresh, Version::initial(), &["X"]));
        tx.add(append(busy, Version::initial(), &["Y"]));

        assert!(store.commit(tx).await.unwrap_err().is_conflict());
        assert!(store.read_stream(fresh).await.unwrap().is_empty());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn multi_stream_commit_stamps_one_transaction() {
        let store = InMemoryLedgerStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let mut tx = Transaction::new();
        tx.add(append(a, Version::initial(), &["A1"]));
        tx.add(append(b, Version::initial(), &["B1", "B2"]));
        let id = tx.id();

        let receipt = store.commit(tx).await.unwrap();
        assert_eq!(receipt.transaction_id, id);
        assert_eq!(receipt.version_of(a), Some(Version::new(1)));
        assert_eq!(receipt.version_of(b), Some(Version::new(2)));

        let mut events = store.read_stream(a).await.unwrap();
        events.extend(store.read_stream(b).await.unwrap());
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.transaction_id == id));
        assert_eq!(store.stream_count().await, 2);
    }

    #[tokio::test]
    async fn missing_stream_is_empty() {
        let store = InMemoryLedgerStore::new();
        assert!(store.read_stream(AggregateId::new()).await.unwrap().is_empty());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_transaction_rejected() {
        let store = InMemoryLedgerStore::new();
        let result = store.commit(Transaction::new()).await;
        assert!(matches!(result, Err(StoreError::InvalidTransaction(_))));
    }
}
