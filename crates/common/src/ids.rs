//! Ledger identifiers.

use serde::{Deserialize, Serialize};

use crate::AggregateId;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Stream kind used when deriving the ledger stream id.
            pub const KIND: &'static str = $kind;

            /// Wraps a raw id value.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw id value.
            pub fn value(&self) -> u64 {
                self.0
            }

            /// Returns the ledger stream that holds this record's events.
            pub fn stream_id(&self) -> AggregateId {
                AggregateId::derived(Self::KIND, &self.0.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

sequential_id!(
    /// Integer id of a registered company, assigned at onboarding.
    CompanyId,
    "company-id"
);

sequential_id!(
    /// Integer id of a product node, assigned monotonically at creation.
    ProductId,
    "product"
);

sequential_id!(
    /// Integer id of an order.
    OrderId,
    "order"
);

/// Opaque external identifier of a participant (e.g. a wallet address).
///
/// The ledger never interprets or checksums addresses; two addresses are
/// the same participant only if they are byte-for-byte equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Stream kind for company records, which are keyed by address.
    pub const KIND: &'static str = "company";

    /// Creates an address from any string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty address.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the ledger stream of the company registered under this address.
    pub fn stream_id(&self) -> AggregateId {
        AggregateId::derived(Self::KIND, &self.0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
