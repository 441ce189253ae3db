//! Company aggregate.

use chrono::{DateTime, Utc};
use common::{Address, CompanyId};
use ledger_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::error::DomainError;

use super::CompanyEvent;

/// A registered participant of the supply chain.
///
/// Records are never deleted; deactivation only clears the active flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: String,
    address: Address,
    registered: bool,
    active: bool,
    registered_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    version: Version,
}

impl Aggregate for Company {
    type Event = CompanyEvent;

    fn aggregate_type() -> &'static str {
        "Company"
    }

    fn exists(&self) -> bool {
        self.registered
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CompanyEvent::CompanyRegistered(data) => {
                self.id = data.company_id;
                self.name = data.name;
                self.address = data.address;
                self.registered = true;
                self.active = true;
                self.registered_at = Some(data.registered_at);
            }
            CompanyEvent::CompanyDeactivated(_) => {
                self.active = false;
            }
        }
    }
}

// Query methods
impl Company {
    pub fn id(&self) -> CompanyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns false once the company has been deactivated.
    pub fn is_active(&self) -> bool {
        self.registered && self.active
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }
}

// Command methods (return events)
impl Company {
    /// Registers the company. Fails if this address already has a record.
    pub fn register(
        &self,
        company_id: CompanyId,
        name: &str,
        address: &Address,
        now: DateTime<Utc>,
    ) -> Result<Vec<CompanyEvent>, DomainError> {
        if self.registered {
            return Err(DomainError::DuplicateIdentity {
                address: address.to_string(),
            });
        }
        if name.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "company name must not be empty".to_string(),
            ));
        }
        if address.is_empty() {
            return Err(DomainError::InvalidInput(
                "company address must not be empty".to_string(),
            ));
        }

        Ok(vec![CompanyEvent::registered(
            company_id,
            name.trim(),
            address.clone(),
            now,
        )])
    }

    /// Deactivates the company.
    pub fn deactivate(&self, now: DateTime<Utc>) -> Result<Vec<CompanyEvent>, DomainError> {
        if !self.registered {
            return Err(DomainError::CompanyNotFound {
                company: self.address.to_string(),
            });
        }
        if !self.active {
            return Err(DomainError::IdentityDeactivated {
                address: self.address.to_string(),
            });
        }

        Ok(vec![CompanyEvent::deactivated(now)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> Company {
        let mut company = Company::default();
        let events = company
            .register(CompanyId::new(1), "Acme Farms", &Address::new("0xA11CE"), Utc::now())
            .unwrap();
        company.apply_events(events);
        company
    }

    #[test]
    fn register_sets_fields() {
        let company = registered();
        assert!(company.exists());
        assert!(company.is_active());
        assert_eq!(company.id(), CompanyId::new(1));
        assert_eq!(company.name(), "Acme Farms");
        assert_eq!(company.address().as_str(), "0xA11CE");
    }

    #[test]
    fn register_twice_is_duplicate() {
        let company = registered();
        let result = company.register(
            CompanyId::new(2),
            "Other",
            &Address::new("0xA11CE"),
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::DuplicateIdentity { .. })));
    }

    #[test]
    fn register_rejects_blank_fields() {
        let company = Company::default();
        assert!(
            company
                .register(CompanyId::new(1), " ", &Address::new("0x1"), Utc::now())
                .is_err()
        );
        assert!(
            company
                .register(CompanyId::new(1), "Acme", &Address::new(""), Utc::now())
                .is_err()
        );
    }

    #[test]
    fn deactivate_keeps_record() {
        let mut company = registered();
        let events = company.deactivate(Utc::now()).unwrap();
        company.apply_events(events);

        assert!(company.exists());
        assert!(!company.is_active());
        assert!(matches!(
            company.deactivate(Utc::now()),
            Err(DomainError::IdentityDeactivated { .. })
        ));
    }
}
