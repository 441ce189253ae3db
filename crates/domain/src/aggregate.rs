//! Core aggregate and domain event traits.

use ledger_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the ledger.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced ledger records.
///
/// An aggregate is rebuilt by replaying its stream. Command methods on the
/// concrete types inspect current state and return new events without
/// mutating anything; [`Aggregate::apply`] folds an event into state.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the aggregate type name, stored as the stream type.
    fn aggregate_type() -> &'static str;

    /// Returns true once the creation event has been applied.
    fn exists(&self) -> bool;

    /// Returns the current stream version.
    ///
    /// Version is 0 for a record that has never been written.
    fn version(&self) -> Version;

    /// Sets the stream version. Called by the repository while replaying.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and deterministic, and must not fail: events are facts.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
