//! Monotonic integer id allocation.
//!
//! Each id kind has its own sequence stream. Allocating stages an
//! `IdAllocated` event in the caller's unit of work, so the id is only
//! consumed if the record it names is committed with it.

use common::AggregateId;
use ledger_store::{LedgerStore, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;
use crate::repository::{Repository, UnitOfWork};

const SEQUENCE_KIND: &str = "sequence";

/// Events of a sequence stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SequenceEvent {
    IdAllocated(IdAllocatedData),
}

impl DomainEvent for SequenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SequenceEvent::IdAllocated(_) => "IdAllocated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocatedData {
    pub value: u64,
}

/// Last id handed out for one kind.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    last: u64,
    version: Version,
}

impl Sequence {
    /// Stream holding the sequence for `kind`.
    pub fn stream_id(kind: &str) -> AggregateId {
        AggregateId::derived(SEQUENCE_KIND, kind)
    }

    /// Last allocated value, 0 if none.
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Returns the event allocating the next id.
    pub fn next(&self) -> SequenceEvent {
        SequenceEvent::IdAllocated(IdAllocatedData {
            value: self.last + 1,
        })
    }
}

impl Aggregate for Sequence {
    type Event = SequenceEvent;

    fn aggregate_type() -> &'static str {
        "Sequence"
    }

    fn exists(&self) -> bool {
        self.last > 0
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            SequenceEvent::IdAllocated(data) => self.last = data.value,
        }
    }
}

/// Stages the allocation of the next id of `kind` and returns it.
///
/// A unit of work may allocate at most once per kind.
pub(crate) async fn allocate<S: LedgerStore>(
    repo: &Repository<S>,
    unit: &mut UnitOfWork,
    kind: &str,
) -> Result<u64, DomainError> {
    let stream_id = Sequence::stream_id(kind);
    if unit.touches(stream_id) {
        return Err(DomainError::InvalidInput(format!(
            "id of kind {kind} already allocated in this unit of work"
        )));
    }

    let sequence: Sequence = repo.load(stream_id).await?;
    let value = sequence.last() + 1;
    unit.stage(stream_id, &sequence, &[sequence.next()])?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_store::InMemoryLedgerStore;

    #[tokio::test]
    async fn allocates_consecutive_ids() {
        let repo = Repository::new(InMemoryLedgerStore::new());

        for expected in 1..=3 {
            let mut unit = UnitOfWork::new();
            let id = allocate(&repo, &mut unit, "product").await.unwrap();
            assert_eq!(id, expected);
            repo.commit(unit).await.unwrap();
        }
    }

    #[tokio::test]
    async fn uncommitted_allocation_is_not_consumed() {
        let repo = Repository::new(InMemoryLedgerStore::new());

        let mut dropped = UnitOfWork::new();
        assert_eq!(allocate(&repo, &mut dropped, "order").await.unwrap(), 1);
        drop(dropped);

        let mut unit = UnitOfWork::new();
        assert_eq!(allocate(&repo, &mut unit, "order").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn kinds_are_independent() {
        let repo = Repository::new(InMemoryLedgerStore::new());
        let mut unit = UnitOfWork::new();
        assert_eq!(allocate(&repo, &mut unit, "product").await.unwrap(), 1);
        assert_eq!(allocate(&repo, &mut unit, "order").await.unwrap(), 1);
        assert!(allocate(&repo, &mut unit, "order").await.is_err());
    }
}
