//! Company domain events.

use chrono::{DateTime, Utc};
use common::{Address, CompanyId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a company record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CompanyEvent {
    /// A company was onboarded under an address.
    CompanyRegistered(CompanyRegisteredData),

    /// A company was deactivated. The record is kept.
    CompanyDeactivated(CompanyDeactivatedData),
}

impl DomainEvent for CompanyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompanyEvent::CompanyRegistered(_) => "CompanyRegistered",
            CompanyEvent::CompanyDeactivated(_) => "CompanyDeactivated",
        }
    }
}

/// Data for CompanyRegistered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRegisteredData {
    pub company_id: CompanyId,
    pub name: String,
    pub address: Address,
    pub registered_at: DateTime<Utc>,
}

/// Data for CompanyDeactivated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDeactivatedData {
    pub deactivated_at: DateTime<Utc>,
}

impl CompanyEvent {
    /// Creates a CompanyRegistered event.
    pub fn registered(
        company_id: CompanyId,
        name: impl Into<String>,
        address: Address,
        registered_at: DateTime<Utc>,
    ) -> Self {
        CompanyEvent::CompanyRegistered(CompanyRegisteredData {
            company_id,
            name: name.into(),
            address,
            registered_at,
        })
    }

    /// Creates a CompanyDeactivated event.
    pub fn deactivated(deactivated_at: DateTime<Utc>) -> Self {
        CompanyEvent::CompanyDeactivated(CompanyDeactivatedData { deactivated_at })
    }
}
