//! Product catalogue service.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use spm_core::validate::ensure_length;
use spm_core::{DomainError, NodeId, ProductId};
use spm_products::product::{CATEGORY_MAX, CATEGORY_MIN};
use spm_products::{Product, ProductProps, ProductUpdate};
use spm_taxonomy::{NodeType, TaxonomyNode};

use crate::error::ServiceResult;
use crate::store::{DocumentStore, Query};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRename {
    pub updated: usize,
    pub message: String,
}

/// Product CRUD and queries. Taxonomy references are checked against the node
/// table.
pub struct ProductService<P, N> {
    products: P,
    nodes: N,
}

impl<P, N> ProductService<P, N>
where
    P: DocumentStore<Product>,
    N: DocumentStore<TaxonomyNode>,
{
    pub fn new(products: P, nodes: N) -> Self {
        Self { products, nodes }
    }

    pub fn store(&self) -> &P {
        &self.products
    }

    fn load(&self, id: ProductId) -> ServiceResult<Product> {
        self.products
            .get(id)?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    fn ensure_category_node(&self, node_id: Option<NodeId>) -> ServiceResult<()> {
        let Some(node_id) = node_id else {
            return Ok(());
        };
        match self.nodes.get(node_id)? {
            Some(node) if node.node_type() == NodeType::Category => Ok(()),
            Some(node) => Err(DomainError::validation(format!(
                "taxonomy node {node_id} is a {}, not a category",
                node.node_type()
            ))
            .into()),
            None => Err(DomainError::validation(format!("taxonomy node {node_id} does not exist")).into()),
        }
    }

    #[instrument(skip_all, fields(name = %props.name))]
    pub fn create(&self, props: ProductProps) -> ServiceResult<ProductId> {
        props.validate()?;
        self.ensure_category_node(props.taxonomy_node_id)?;
        let id = self.products.insert(props)?;
        info!(product_id = %id, "product created");
        Ok(id)
    }

    /// Merge `update` into the stored product.
    pub fn update_by_id(&self, id: ProductId, update: ProductUpdate) -> ServiceResult<Product> {
        let current = self.load(id)?;
        let touches_node = update.taxonomy_node_id.is_some();
        let next = update.applied_to(&current.props)?;
        if touches_node {
            self.ensure_category_node(next.taxonomy_node_id)?;
        }
        self.write(id, next)
    }

    /// Replace every field of the stored product.
    pub fn update_by_id_full(&self, id: ProductId, props: ProductProps) -> ServiceResult<Product> {
        self.load(id)?;
        props.validate()?;
        self.ensure_category_node(props.taxonomy_node_id)?;
        self.write(id, props)
    }

    pub fn update_price(&self, id: ProductId, price: u64) -> ServiceResult<Product> {
        self.update_by_id(id, ProductUpdate::new().price(Some(price)))
    }

    fn write(&self, id: ProductId, props: ProductProps) -> ServiceResult<Product> {
        self.products.patch(id, props)?;
        info!(product_id = %id, "product updated");
        self.load(id)
    }

    pub fn delete_by_id(&self, id: ProductId) -> ServiceResult<()> {
        self.load(id)?;
        self.products.delete(id)?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Move every product in category `old` to category `new`.
    #[instrument(skip(self))]
    pub fn bulk_update_category(&self, old: &str, new: &str) -> ServiceResult<CategoryRename> {
        ensure_length("old_category", old, 1, CATEGORY_MAX)?;
        ensure_length("new_category", new, CATEGORY_MIN, CATEGORY_MAX)?;

        let matching = self.get_by_category(old)?;
        if matching.is_empty() {
            return Ok(CategoryRename {
                updated: 0,
                message: format!("No products found with category '{old}'"),
            });
        }

        for product in &matching {
            let props = ProductProps {
                category: Some(new.to_string()),
                ..product.props.clone()
            };
            self.products.patch(product.id, props)?;
        }
        info!(updated = matching.len(), "category renamed across products");
        Ok(CategoryRename {
            updated: matching.len(),
            message: format!(
                "Updated {} products from '{old}' to '{new}'",
                matching.len()
            ),
        })
    }

    pub fn get_all(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.products.collect(&Query::all())?)
    }

    pub fn get_by_id(&self, id: ProductId) -> ServiceResult<Option<Product>> {
        Ok(self.products.get(id)?)
    }

    /// Exact category match.
    pub fn get_by_category(&self, category: &str) -> ServiceResult<Vec<Product>> {
        let category = category.to_string();
        let query = Query::all()
            .filter(move |p: &Product| p.props.category.as_deref() == Some(category.as_str()));
        Ok(self.products.collect(&query)?)
    }

    /// Products at the given taxonomy category.
    pub fn get_by_taxonomy_node(&self, node_id: NodeId) -> ServiceResult<Vec<Product>> {
        let query = Query::all().filter(move |p: &Product| p.props.taxonomy_node_id == Some(node_id));
        Ok(self.products.collect(&query)?)
    }

    /// Inclusive range over minor units. Unpriced products never match.
    pub fn get_in_price_range(&self, min: u64, max: u64) -> ServiceResult<Vec<Product>> {
        if min > max {
            return Err(DomainError::validation(
                "Minimum price cannot be greater than maximum price",
            )
            .into());
        }
        let query = Query::all().filter(move |p: &Product| p.price_within(min, max));
        Ok(self.products.collect(&query)?)
    }

    /// Case-insensitive substring search over name, description and category.
    /// The term is matched as given, surrounding whitespace included.
    pub fn search(&self, term: &str) -> ServiceResult<Vec<Product>> {
        ensure_length("search_term", term, 1, 100)?;
        let needle = term.to_lowercase();
        let query = Query::all().filter(move |p: &Product| p.matches_term(&needle));
        let hits = self.products.collect(&query)?;
        debug!(term, hits = hits.len(), "product search");
        Ok(hits)
    }
}
