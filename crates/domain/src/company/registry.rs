//! Identity registry: onboarding and lookup of companies.

use std::sync::Arc;

use common::{Address, Clock, CompanyId};
use ledger_store::LedgerStore;

use crate::aggregate::Aggregate;
use crate::error::DomainError;
use crate::repository::{Repository, UnitOfWork};
use crate::sequence;

use super::Company;

/// Registry of companies, keyed by address with an id index.
///
/// A company record lives in the stream derived from its address. A second
/// stream derived from its integer id holds a copy of the registration event
/// and is used to resolve ids back to addresses.
#[derive(Clone)]
pub struct IdentityRegistry<S> {
    repo: Repository<S>,
    clock: Arc<dyn Clock>,
}

impl<S: LedgerStore> IdentityRegistry<S> {
    /// Creates a registry over `repo`.
    pub fn new(repo: Repository<S>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Registers a company under `address`.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, name: &str, address: &Address) -> Result<Company, DomainError> {
        let company = self
            .repo
            .retry_on_conflict("register_company", || self.try_register(name, address))
            .await?;

        tracing::info!(company_id = %company.id(), %address, "company registered");
        Ok(company)
    }

    async fn try_register(&self, name: &str, address: &Address) -> Result<Company, DomainError> {
        let mut company: Company = self.repo.load(address.stream_id()).await?;
        if company.exists() {
            return Err(DomainError::DuplicateIdentity {
                address: address.to_string(),
            });
        }

        let mut unit = UnitOfWork::new();
        let id = CompanyId::new(sequence::allocate(&self.repo, &mut unit, CompanyId::KIND).await?);
        let events = company.register(id, name, address, self.clock.now())?;

        unit.stage(address.stream_id(), &company, &events)?;
        unit.stage(id.stream_id(), &Company::default(), &events)?;
        self.repo.commit(unit).await?;

        company.apply_events(events);
        Ok(company)
    }

    /// Looks up a company by address.
    pub async fn lookup(&self, address: &Address) -> Result<Option<Company>, DomainError> {
        self.repo.load_existing(address.stream_id()).await
    }

    /// Looks up a company by its integer id.
    pub async fn lookup_by_id(&self, id: CompanyId) -> Result<Option<Company>, DomainError> {
        let indexed: Option<Company> = self.repo.load_existing(id.stream_id()).await?;
        match indexed {
            Some(indexed) => self.lookup(indexed.address()).await,
            None => Ok(None),
        }
    }

    /// Returns the company at `address`, active or not.
    pub async fn require(&self, address: &Address) -> Result<Company, DomainError> {
        self.lookup(address)
            .await?
            .ok_or_else(|| DomainError::CompanyNotFound {
                company: address.to_string(),
            })
    }

    /// Returns the company at `address`, failing if it is unknown or deactivated.
    pub async fn require_active(&self, address: &Address) -> Result<Company, DomainError> {
        let company = self.require(address).await?;
        if !company.is_active() {
            return Err(DomainError::IdentityDeactivated {
                address: address.to_string(),
            });
        }
        Ok(company)
    }

    /// Deactivates the company at `address`.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(&self, address: &Address) -> Result<Company, DomainError> {
        let company = self
            .repo
            .retry_on_conflict("deactivate_company", || self.try_deactivate(address))
            .await?;

        tracing::info!(company_id = %company.id(), %address, "company deactivated");
        Ok(company)
    }

    async fn try_deactivate(&self, address: &Address) -> Result<Company, DomainError> {
        let mut company = self.require(address).await?;
        let events = company.deactivate(self.clock.now())?;

        let mut unit = UnitOfWork::new();
        unit.stage(address.stream_id(), &company, &events)?;
        self.repo.commit(unit).await?;

        company.apply_events(events);
        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SystemClock;
    use ledger_store::InMemoryLedgerStore;

    fn registry() -> IdentityRegistry<InMemoryLedgerStore> {
        IdentityRegistry::new(
            Repository::new(InMemoryLedgerStore::new()),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = registry();
        let address = Address::new("0xA11CE");

        let company = registry.register("Acme Farms", &address).await.unwrap();
        assert_eq!(company.id(), CompanyId::new(1));

        let found = registry.lookup(&address).await.unwrap().unwrap();
        assert_eq!(found.name(), "Acme Farms");

        let by_id = registry.lookup_by_id(CompanyId::new(1)).await.unwrap();
        assert_eq!(by_id.unwrap().address(), &address);
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let registry = registry();
        let a = registry.register("A", &Address::new("0xA")).await.unwrap();
        let b = registry.register("B", &Address::new("0xB")).await.unwrap();
        assert_eq!(a.id(), CompanyId::new(1));
        assert_eq!(b.id(), CompanyId::new(2));
    }

    #[tokio::test]
    async fn duplicate_address_rejected() {
        let registry = registry();
        let address = Address::new("0xA11CE");
        registry.register("Acme", &address).await.unwrap();

        let result = registry.register("Copycat", &address).await;
        assert!(matches!(result, Err(DomainError::DuplicateIdentity { .. })));
    }

    #[tokio::test]
    async fn unknown_lookups_are_none() {
        let registry = registry();
        assert!(registry.lookup(&Address::new("0x0")).await.unwrap().is_none());
        assert!(
            registry
                .lookup_by_id(CompanyId::new(9))
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            registry.require(&Address::new("0x0")).await,
            Err(DomainError::CompanyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deactivation_is_visible_by_id() {
        let registry = registry();
        let address = Address::new("0xA11CE");
        let company = registry.register("Acme", &address).await.unwrap();

        registry.deactivate(&address).await.unwrap();

        let by_id = registry.lookup_by_id(company.id()).await.unwrap().unwrap();
        assert!(!by_id.is_active());
        assert!(matches!(
            registry.require_active(&address).await,
            Err(DomainError::IdentityDeactivated { .. })
        ));
        assert!(registry.require(&address).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_registration_of_one_address() {
        let registry = registry();
        let address = Address::new("0xRACE");

        let (a, b) = tokio::join!(
            registry.register("First", &address),
            registry.register("Second", &address)
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(DomainError::DuplicateIdentity { .. })));
    }
}
