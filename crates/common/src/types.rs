use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for stream ids derived from natural keys.
const LEDGER_NAMESPACE: Uuid = Uuid::from_u128(0x6c0f_3f5e_9a1d_4b7e_8d2c_51a4_e0b9_c713);

/// Identifier of an event stream (one aggregate instance) in the ledger store.
///
/// Ledger records are keyed by natural ids (product number, company
/// address), so stream ids are usually derived deterministically with
/// [`AggregateId::derived`]. Random ids remain available for ad-hoc streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives the stream id for `key` within the aggregate `kind`.
    ///
    /// The same `(kind, key)` pair always yields the same id, and distinct
    /// kinds never collide for equal keys.
    pub fn derived(kind: &str, key: &str) -> Self {
        let name = format!("{kind}/{key}");
        Self(Uuid::new_v5(&LEDGER_NAMESPACE, name.as_bytes()))
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}
