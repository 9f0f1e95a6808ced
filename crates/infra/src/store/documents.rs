use spm_core::{NodeId, PortfolioId, ProductId};
use spm_products::{PortfolioProps, Product, ProductPortfolio, ProductProps};
use spm_taxonomy::{NewTaxonomyNode, NodePatch, TaxonomyNode};

use super::r#trait::Document;

impl Document for TaxonomyNode {
    type Record = NewTaxonomyNode;
    type Patch = NodePatch;

    const TABLE: &'static str = "taxonomy_nodes";

    fn new_id() -> NodeId {
        NodeId::new()
    }

    fn from_record(id: NodeId, record: NewTaxonomyNode) -> Self {
        TaxonomyNode::from_record(id, record)
    }

    fn apply_patch(&mut self, patch: NodePatch) {
        patch.apply(self);
    }
}

/// Product patches replace the whole property set; partial updates are merged
/// by the service before writing.
impl Document for Product {
    type Record = ProductProps;
    type Patch = ProductProps;

    const TABLE: &'static str = "products";

    fn new_id() -> ProductId {
        ProductId::new()
    }

    fn from_record(id: ProductId, record: ProductProps) -> Self {
        Product::from_record(id, record)
    }

    fn apply_patch(&mut self, patch: ProductProps) {
        self.props = patch;
    }
}

impl Document for ProductPortfolio {
    type Record = PortfolioProps;
    type Patch = PortfolioProps;

    const TABLE: &'static str = "product_portfolios";

    fn new_id() -> PortfolioId {
        PortfolioId::new()
    }

    fn from_record(id: PortfolioId, record: PortfolioProps) -> Self {
        ProductPortfolio::from_record(id, record)
    }

    fn apply_patch(&mut self, patch: PortfolioProps) {
        self.props = patch;
    }
}
