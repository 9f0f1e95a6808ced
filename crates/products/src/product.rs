use core::str::FromStr;

use serde::{Deserialize, Serialize};

use spm_core::validate::{ensure_length, ensure_optional_length};
use spm_core::{DomainError, DomainResult, Entity, NodeId, ProductId};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const CATEGORY_MIN: usize = 2;
pub const CATEGORY_MAX: usize = 100;
pub const LABEL_MIN: usize = 1;
pub const LABEL_MAX: usize = 100;

/// Strategic posture of a product (TIME-style classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modernity {
    Migrate,
    Hold,
    Continue,
    Adopt,
    Assess,
}

impl Modernity {
    pub fn as_str(self) -> &'static str {
        match self {
            Modernity::Migrate => "migrate",
            Modernity::Hold => "hold",
            Modernity::Continue => "continue",
            Modernity::Adopt => "adopt",
            Modernity::Assess => "assess",
        }
    }
}

impl core::fmt::Display for Modernity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modernity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "migrate" => Ok(Modernity::Migrate),
            "hold" => Ok(Modernity::Hold),
            "continue" => Ok(Modernity::Continue),
            "adopt" => Ok(Modernity::Adopt),
            "assess" => Ok(Modernity::Assess),
            other => Err(DomainError::validation(format!("invalid modernity: {other}"))),
        }
    }
}

/// A stored catalogue product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub props: ProductProps,
}

impl Product {
    pub fn from_record(id: ProductId, props: ProductProps) -> Self {
        Self { id, props }
    }

    /// Case-insensitive substring match on name, description and category.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_term(&self, needle: &str) -> bool {
        let hit = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(needle));
        hit(Some(&self.props.name))
            || hit(self.props.description.as_deref())
            || hit(self.props.category.as_deref())
    }

    pub fn price_within(&self, min: u64, max: u64) -> bool {
        self.props.price.is_some_and(|p| (min..=max).contains(&p))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Everything a product stores besides its id. Also the create payload and
/// the full-replace payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProps {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minor currency units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Must point at a `category` node when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_node_id: Option<NodeId>,
    pub product_owner: String,
    pub lifecycle_status: String,
    pub modernity: Modernity,
}

impl ProductProps {
    pub fn new(
        name: impl Into<String>,
        product_owner: impl Into<String>,
        lifecycle_status: impl Into<String>,
        modernity: Modernity,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            price: None,
            category: None,
            taxonomy_node_id: None,
            product_owner: product_owner.into(),
            lifecycle_status: lifecycle_status.into(),
            modernity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_taxonomy_node(mut self, node_id: NodeId) -> Self {
        self.taxonomy_node_id = Some(node_id);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_length("name", &self.name, NAME_MIN, NAME_MAX)?;
        ensure_optional_length("description", self.description.as_deref(), 0, DESCRIPTION_MAX)?;
        ensure_optional_length("category", self.category.as_deref(), CATEGORY_MIN, CATEGORY_MAX)?;
        ensure_length("product_owner", &self.product_owner, LABEL_MIN, LABEL_MAX)?;
        ensure_length("lifecycle_status", &self.lifecycle_status, LABEL_MIN, LABEL_MAX)?;
        Ok(())
    }
}

/// Partial update. `None` leaves a field untouched; for optional fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Option<u64>>,
    #[serde(default)]
    pub category: Option<Option<String>>,
    #[serde(default)]
    pub taxonomy_node_id: Option<Option<NodeId>>,
    #[serde(default)]
    pub product_owner: Option<String>,
    #[serde(default)]
    pub lifecycle_status: Option<String>,
    #[serde(default)]
    pub modernity: Option<Modernity>,
}

impl ProductUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn price(mut self, price: Option<u64>) -> Self {
        self.price = Some(price);
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(category);
        self
    }

    pub fn taxonomy_node(mut self, node_id: Option<NodeId>) -> Self {
        self.taxonomy_node_id = Some(node_id);
        self
    }

    pub fn modernity(mut self, modernity: Modernity) -> Self {
        self.modernity = Some(modernity);
        self
    }

    /// The taxonomy node this update points the product at, if it sets one.
    pub fn new_taxonomy_node(&self) -> Option<NodeId> {
        self.taxonomy_node_id.flatten()
    }

    /// Apply onto a copy of `props` and validate the result.
    pub fn applied_to(self, props: &ProductProps) -> DomainResult<ProductProps> {
        let mut next = props.clone();
        if let Some(name) = self.name {
            next.name = name;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if let Some(category) = self.category {
            next.category = category;
        }
        if let Some(node_id) = self.taxonomy_node_id {
            next.taxonomy_node_id = node_id;
        }
        if let Some(owner) = self.product_owner {
            next.product_owner = owner;
        }
        if let Some(status) = self.lifecycle_status {
            next.lifecycle_status = status;
        }
        if let Some(modernity) = self.modernity {
            next.modernity = modernity;
        }
        next.validate()?;
        Ok(next)
    }
}
