use serde::{Deserialize, Serialize};

use spm_core::validate::ensure_length;
use spm_core::{DomainResult, Entity, PortfolioId};

pub const PORTFOLIO_NAME_MIN: usize = 2;
pub const PORTFOLIO_NAME_MAX: usize = 100;
pub const PORTFOLIO_DESCRIPTION_MIN: usize = 10;
pub const PORTFOLIO_DESCRIPTION_MAX: usize = 500;

/// A record in the flat portfolio register, kept apart from the taxonomy tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPortfolio {
    pub id: PortfolioId,
    #[serde(flatten)]
    pub props: PortfolioProps,
}

impl ProductPortfolio {
    pub fn from_record(id: PortfolioId, props: PortfolioProps) -> Self {
        Self { id, props }
    }
}

impl Entity for ProductPortfolio {
    type Id = PortfolioId;

    fn id(&self) -> PortfolioId {
        self.id
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioProps {
    pub name: String,
    pub description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// `None` for a top-level portfolio. Not checked against the register.
    #[serde(default)]
    pub parent_id: Option<PortfolioId>,
}

impl PortfolioProps {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_active: true,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: PortfolioId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        ensure_length("name", &self.name, PORTFOLIO_NAME_MIN, PORTFOLIO_NAME_MAX)?;
        ensure_length(
            "description",
            &self.description,
            PORTFOLIO_DESCRIPTION_MIN,
            PORTFOLIO_DESCRIPTION_MAX,
        )
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub parent_id: Option<Option<PortfolioId>>,
}

impl PortfolioUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn parent(mut self, parent_id: Option<PortfolioId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Apply onto a copy of `props` and validate the result.
    pub fn applied_to(self, props: &PortfolioProps) -> DomainResult<PortfolioProps> {
        let mut next = props.clone();
        if let Some(name) = self.name {
            next.name = name;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(is_active) = self.is_active {
            next.is_active = is_active;
        }
        if let Some(parent_id) = self.parent_id {
            next.parent_id = parent_id;
        }
        next.validate()?;
        Ok(next)
    }
}
