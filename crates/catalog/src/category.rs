use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult};

use crate::product::Product;
use crate::validate;

/// Category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub category_name: String,
}

/// Validated category name, used for both create and rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryName(String);

impl CategoryName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        validate::name("category_name", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Category with the products that belong to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}
