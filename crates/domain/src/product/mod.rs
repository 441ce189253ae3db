//! Product nodes of the provenance graph.

mod aggregate;
mod events;
mod store;
mod transfer;
mod values;

pub use aggregate::Product;
pub use events::{
    LotDerivedData, LotSplitData, OwnershipTransferredData, ProductCreatedData, ProductEvent,
    StockConsumedData,
};
pub use store::ProvenanceStore;
pub use transfer::TransferEngine;
pub use values::{ComponentEdge, ComponentSpec, NewProduct};
