use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::AggregateId;

/// Position of an event within its stream, used for optimistic concurrency.
///
/// A stream with no events is at version 0; its first event is version 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of a stream that has no events yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version of a stream's first event.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A persisted event together with its stream coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique id of this event.
    pub event_id: Uuid,

    /// Transaction that committed this event. Events committed together
    /// (e.g. an order settlement and its ownership transfer) share it.
    pub transaction_id: Uuid,

    /// The stream the event belongs to.
    pub stream_id: AggregateId,

    /// Kind of record the stream holds ("Product", "Order", ...).
    pub stream_type: String,

    /// Event name ("ProductMinted", "DeliveryRecorded", ...).
    pub event_type: String,

    /// Stream version after this event.
    pub version: Version,

    /// When the event was staged.
    pub recorded_at: DateTime<Utc>,

    /// Event body as JSON.
    pub payload: serde_json::Value,
}

impl StoredEvent {
    /// Decodes the payload into a concrete event type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(Version::new(1) < Version::new(2));
        assert_eq!(Version::initial().next(), Version::first());
        assert_eq!(Version::first().as_i64(), 1);
    }

    #[test]
    fn decode_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Minted {
            quantity: u64,
        }

        let event = StoredEvent {
            event_id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            stream_id: AggregateId::new(),
            stream_type: "Product".to_string(),
            event_type: "ProductMinted".to_string(),
            version: Version::first(),
            recorded_at: Utc::now(),
            payload: serde_json::json!({ "quantity": 100 }),
        };

        let decoded: Minted = event.decode().unwrap();
        assert_eq!(decoded, Minted { quantity: 100 });
    }
}
