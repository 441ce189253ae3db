use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{AggregateId, Result, StoreError, StoredEvent, Version};

/// New events for a single stream, decided against `expected_version`.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    stream_id: AggregateId,
    stream_type: String,
    expected_version: Version,
    events: Vec<StoredEvent>,
}

impl StreamAppend {
    /// Starts an append to `stream_id`, which must currently be at `expected_version`.
    pub fn new(
        stream_id: AggregateId,
        stream_type: impl Into<String>,
        expected_version: Version,
    ) -> Self {
        Self {
            stream_id,
            stream_type: stream_type.into(),
            expected_version,
            events: Vec::new(),
        }
    }

    /// Adds an event and returns the stream version it will occupy.
    pub fn push<E: Serialize>(
        &mut self,
        event_type: impl Into<String>,
        payload: &E,
    ) -> std::result::Result<Version, serde_json::Error> {
        let version = self.last_version().next();
        self.events.push(StoredEvent {
            event_id: Uuid::new_v4(),
            transaction_id: Uuid::nil(),
            stream_id: self.stream_id,
            stream_type: self.stream_type.clone(),
            event_type: event_type.into(),
            version,
            recorded_at: Utc::now(),
            payload: serde_json::to_value(payload)?,
        });
        Ok(version)
    }

    /// The stream this append targets.
    pub fn stream_id(&self) -> AggregateId {
        self.stream_id
    }

    /// The version the stream must be at for the append to apply.
    pub fn expected_version(&self) -> Version {
        self.expected_version
    }

    /// The version the stream will be at after the append.
    pub fn last_version(&self) -> Version {
        self.events
            .last()
            .map(|e| e.version)
            .unwrap_or(self.expected_version)
    }

    /// The staged events, in version order.
    pub fn events(&self) -> &[StoredEvent] {
        &self.events
    }

    /// Consumes the append, returning its events.
    pub fn into_events(self) -> Vec<StoredEvent> {
        self.events
    }
}

/// A set of stream appends committed all-or-nothing.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Uuid,
    appends: Vec<StreamAppend>,
}

impl Transaction {
    /// Creates an empty transaction with a fresh id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            appends: Vec::new(),
        }
    }

    /// The id stamped on every event of this transaction.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Adds an append. Its events are stamped with the transaction id.
    pub fn add(&mut self, mut append: StreamAppend) {
        for event in &mut append.events {
            event.transaction_id = self.id;
        }
        self.appends.push(append);
    }

    /// The staged appends.
    pub fn appends(&self) -> &[StreamAppend] {
        &self.appends
    }

    /// Consumes the transaction, returning its appends.
    pub fn into_appends(self) -> Vec<StreamAppend> {
        self.appends
    }

    /// Checks the transaction is well formed before it reaches a backend.
    ///
    /// Every append must be non-empty, target a distinct stream, and carry
    /// consecutive versions starting right after its expected version.
    pub fn validate(&self) -> Result<()> {
        if self.appends.is_empty() {
            return Err(StoreError::InvalidTransaction(
                "transaction has no appends".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for append in &self.appends {
            if append.events.is_empty() {
                return Err(StoreError::InvalidTransaction(format!(
                    "append to stream {} has no events",
                    append.stream_id
                )));
            }
            if !seen.insert(append.stream_id) {
                return Err(StoreError::InvalidTransaction(format!(
                    "stream {} appears twice in one transaction",
                    append.stream_id
                )));
            }

            let mut expected = append.expected_version;
            for event in &append.events {
                expected = expected.next();
                if event.stream_id != append.stream_id {
                    return Err(StoreError::InvalidTransaction(format!(
                        "event {} belongs to stream {}, not {}",
                        event.event_id, event.stream_id, append.stream_id
                    )));
                }
                if event.version != expected {
                    return Err(StoreError::InvalidTransaction(format!(
                        "stream {}: expected version {}, got {}",
                        append.stream_id, expected, event.version
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    /// Id of the committed transaction.
    pub transaction_id: Uuid,

    /// New version of every stream the transaction touched.
    pub versions: Vec<(AggregateId, Version)>,
}

impl CommitReceipt {
    /// Returns the version `stream_id` reached, if the transaction touched it.
    pub fn version_of(&self, stream_id: AggregateId) -> Option<Version> {
        self.versions
            .iter()
            .find(|(id, _)| *id == stream_id)
            .map(|(_, v)| *v)
    }
}

/// Core trait for ledger storage backends.
///
/// Implementations must apply a [`Transaction`] atomically: either every
/// append becomes visible to readers or none does.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Commits a transaction.
    ///
    /// Fails with [`StoreError::ConcurrencyConflict`] if any stream is not
    /// at the append's expected version; nothing is written in that case.
    async fn commit(&self, transaction: Transaction) -> Result<CommitReceipt>;

    /// Returns all events of a stream in version order.
    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append_with(stream_id: AggregateId, expected: Version, count: usize) -> StreamAppend {
        let mut append = StreamAppend::new(stream_id, "Test", expected);
        for i in 0..count {
            append
                .push("Tested", &serde_json::json!({ "n": i }))
                .unwrap();
        }
        append
    }

    #[test]
    fn push_assigns_consecutive_versions() {
        let mut append = StreamAppend::new(AggregateId::new(), "Test", Version::new(4));
        assert_eq!(append.push("A", &1).unwrap(), Version::new(5));
        assert_eq!(append.push("B", &2).unwrap(), Version::new(6));
        assert_eq!(append.last_version(), Version::new(6));
    }

    #[test]
    fn add_stamps_transaction_id() {
        let mut tx = Transaction::new();
        tx.add(append_with(AggregateId::new(), Version::initial(), 2));
        assert!(
            tx.appends()[0]
                .events()
                .iter()
                .all(|e| e.transaction_id == tx.id())
        );
    }

    #[test]
    fn validate_rejects_empty_transaction() {
        let result = Transaction::new().validate();
        assert!(matches!(result, Err(StoreError::InvalidTransaction(_))));
    }

    #[test]
    fn validate_rejects_empty_append() {
        let mut tx = Transaction::new();
        tx.add(append_with(AggregateId::new(), Version::initial(), 0));
        assert!(tx.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_streams() {
        let stream = AggregateId::new();
        let mut tx = Transaction::new();
        tx.add(append_with(stream, Version::initial(), 1));
        tx.add(append_with(stream, Version::first(), 1));
        assert!(tx.validate().is_err());
    }

    #[test]
    fn validate_accepts_multi_stream_transaction() {
        let mut tx = Transaction::new();
        tx.add(append_with(AggregateId::new(), Version::initial(), 1));
        tx.add(append_with(AggregateId::new(), Version::new(3), 2));
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn receipt_lookup() {
        let stream = AggregateId::new();
        let receipt = CommitReceipt {
            transaction_id: Uuid::new_v4(),
            versions: vec![(stream, Version::new(2))],
        };
        assert_eq!(receipt.version_of(stream), Some(Version::new(2)));
        assert_eq!(receipt.version_of(AggregateId::new()), None);
    }
}
