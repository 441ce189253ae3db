//! HTTP route handlers.

pub mod companies;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
