use std::sync::Arc;

use thiserror::Error;

use spm_core::Entity;

/// A record type that can live in a document table.
///
/// `Record` is the insert payload (everything but the id); `Patch` is a
/// partial update applied in place.
pub trait Document: Entity + Clone + Send + Sync + 'static {
    type Record: Send + 'static;
    type Patch: Send + 'static;

    /// Table name, used in errors and logs.
    const TABLE: &'static str;

    /// Fresh store-assigned identifier.
    fn new_id() -> Self::Id;

    fn from_record(id: Self::Id, record: Self::Record) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);
}

type Predicate<D> = Box<dyn Fn(&D) -> bool + Send + Sync>;

/// Conjunction of predicates evaluated by `collect` / `first`.
pub struct Query<D> {
    filters: Vec<Predicate<D>>,
}

impl<D> Query<D> {
    /// Matches every document.
    pub fn all() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: impl Fn(&D) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Add `predicate` only when `condition` holds.
    pub fn filter_if(
        self,
        condition: bool,
        predicate: impl Fn(&D) -> bool + Send + Sync + 'static,
    ) -> Self {
        if condition { self.filter(predicate) } else { self }
    }

    pub fn matches(&self, doc: &D) -> bool {
        self.filters.iter().all(|f| f(doc))
    }
}

impl<D> Default for Query<D> {
    fn default() -> Self {
        Self::all()
    }
}

impl<D> core::fmt::Debug for Query<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Query")
            .field("filters", &self.filters.len())
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{table} table lock poisoned")]
    Poisoned { table: &'static str },

    #[error("{table} document {id} does not exist")]
    Missing { table: &'static str, id: String },

    /// A backend refused or failed the operation.
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn missing<D: Document>(id: D::Id) -> Self {
        StoreError::Missing {
            table: D::TABLE,
            id: id.to_string(),
        }
    }
}

/// Document table boundary.
///
/// Each call is atomic for the record it touches; there is no multi-record
/// transaction. `collect` returns documents in insertion order.
pub trait DocumentStore<D: Document>: Send + Sync {
    fn get(&self, id: D::Id) -> Result<Option<D>, StoreError>;

    /// Insert a new document and return its assigned id.
    fn insert(&self, record: D::Record) -> Result<D::Id, StoreError>;

    /// Fails with [`StoreError::Missing`] when the document is gone.
    fn patch(&self, id: D::Id, patch: D::Patch) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Missing`] when the document is gone.
    fn delete(&self, id: D::Id) -> Result<(), StoreError>;

    fn collect(&self, query: &Query<D>) -> Result<Vec<D>, StoreError>;

    fn first(&self, query: &Query<D>) -> Result<Option<D>, StoreError> {
        Ok(self.collect(query)?.into_iter().next())
    }
}

impl<D, S> DocumentStore<D> for Arc<S>
where
    D: Document,
    S: DocumentStore<D> + ?Sized,
{
    fn get(&self, id: D::Id) -> Result<Option<D>, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, record: D::Record) -> Result<D::Id, StoreError> {
        (**self).insert(record)
    }

    fn patch(&self, id: D::Id, patch: D::Patch) -> Result<(), StoreError> {
        (**self).patch(id, patch)
    }

    fn delete(&self, id: D::Id) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn collect(&self, query: &Query<D>) -> Result<Vec<D>, StoreError> {
        (**self).collect(query)
    }

    fn first(&self, query: &Query<D>) -> Result<Option<D>, StoreError> {
        (**self).first(query)
    }
}
