//! Standalone portfolio register.

use tracing::{info, instrument};

use spm_core::{DomainError, PortfolioId};
use spm_products::{PortfolioProps, PortfolioUpdate, ProductPortfolio};

use crate::error::ServiceResult;
use crate::store::{DocumentStore, Query};

/// CRUD and activation over the portfolio register.
pub struct PortfolioService<S> {
    store: S,
}

impl<S> PortfolioService<S>
where
    S: DocumentStore<ProductPortfolio>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, id: PortfolioId) -> ServiceResult<ProductPortfolio> {
        self.store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("portfolio {id}")).into())
    }

    #[instrument(skip_all, fields(name = %props.name))]
    pub fn create(&self, props: PortfolioProps) -> ServiceResult<PortfolioId> {
        props.validate()?;
        let id = self.store.insert(props)?;
        info!(portfolio_id = %id, "portfolio created");
        Ok(id)
    }

    pub fn update(&self, id: PortfolioId, update: PortfolioUpdate) -> ServiceResult<ProductPortfolio> {
        let current = self.load(id)?;
        let next = update.applied_to(&current.props)?;
        self.store.patch(id, next)?;
        info!(portfolio_id = %id, "portfolio updated");
        self.load(id)
    }

    pub fn remove(&self, id: PortfolioId) -> ServiceResult<()> {
        self.load(id)?;
        self.store.delete(id)?;
        info!(portfolio_id = %id, "portfolio removed");
        Ok(())
    }

    pub fn activate(&self, id: PortfolioId) -> ServiceResult<ProductPortfolio> {
        self.update(id, PortfolioUpdate::new().active(true))
    }

    pub fn deactivate(&self, id: PortfolioId) -> ServiceResult<ProductPortfolio> {
        self.update(id, PortfolioUpdate::new().active(false))
    }

    pub fn get_all(&self) -> ServiceResult<Vec<ProductPortfolio>> {
        Ok(self.store.collect(&Query::all())?)
    }

    pub fn list_active(&self) -> ServiceResult<Vec<ProductPortfolio>> {
        let query = Query::all().filter(|p: &ProductPortfolio| p.props.is_active);
        Ok(self.store.collect(&query)?)
    }

    pub fn get_by_id(&self, id: PortfolioId) -> ServiceResult<Option<ProductPortfolio>> {
        Ok(self.store.get(id)?)
    }

    /// Exact, case-sensitive name match; the first inserted wins.
    pub fn get_by_name(&self, name: &str) -> ServiceResult<Option<ProductPortfolio>> {
        let name = name.to_string();
        let query = Query::all().filter(move |p: &ProductPortfolio| p.props.name == name);
        Ok(self.store.first(&query)?)
    }
}
