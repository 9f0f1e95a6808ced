//! Document store boundary.
//!
//! A generic table abstraction (`get`, `insert`, `patch`, `delete`, filtered
//! `collect` / `first`) plus an in-memory implementation for tests/dev.

pub mod documents;
pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{Document, DocumentStore, Query, StoreError};

/// Taxonomy node table.
pub type NodeStore = InMemoryDocumentStore<spm_taxonomy::TaxonomyNode>;

/// Product table.
pub type ProductStore = InMemoryDocumentStore<spm_products::Product>;

/// Portfolio register table.
pub type PortfolioStore = InMemoryDocumentStore<spm_products::ProductPortfolio>;
