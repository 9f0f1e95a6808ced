//! Product catalogue records.
//!
//! Pure field rules only; persistence and the taxonomy reference check live in
//! `spm-infra`.

pub mod portfolio;
pub mod product;

pub use portfolio::{PortfolioProps, PortfolioUpdate, ProductPortfolio};
pub use product::{Modernity, Product, ProductProps, ProductUpdate};
