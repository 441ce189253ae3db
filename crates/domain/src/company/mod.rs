//! Company records and the identity registry.

mod aggregate;
mod events;
mod registry;

pub use aggregate::Company;
pub use events::{CompanyDeactivatedData, CompanyEvent, CompanyRegisteredData};
pub use registry::IdentityRegistry;
