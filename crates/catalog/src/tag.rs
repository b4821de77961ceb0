use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, ProductId, ProductTagId, TagId};

use crate::product::Product;
use crate::validate;

/// Tag row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tag_name: String,
}

/// Validated tag name, used for both create and rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName(String);

impl TagName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        validate::name("tag_name", raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Tag with the products carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDetail {
    #[serde(flatten)]
    pub tag: Tag,
    pub products: Vec<Product>,
}

/// Association row linking one product to one tag.
///
/// Rows are only ever created or destroyed as a side effect of product
/// writes. Each `(product_id, tag_id)` pair appears at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductTag {
    pub id: ProductTagId,
    pub product_id: ProductId,
    pub tag_id: TagId,
}
