//! Infrastructure layer: document store, services, configuration.

pub mod config;
pub mod error;
pub mod portfolios;
pub mod products;
pub mod store;
pub mod taxonomy;

mod integration_tests;

pub use config::SpmConfig;
pub use error::{ServiceError, ServiceResult};
pub use portfolios::PortfolioService;
pub use products::ProductService;
pub use store::{Document, DocumentStore, InMemoryDocumentStore, NodeStore, PortfolioStore, ProductStore, Query, StoreError};
pub use taxonomy::TaxonomyService;
