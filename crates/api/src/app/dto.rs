use serde::Deserialize;

use storefront_catalog::{CategoryName, NewProduct, ProductChanges, TagName};
use storefront_core::{CategoryId, DomainResult, TagId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub product_name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl CreateProductRequest {
    pub fn into_domain(self) -> DomainResult<NewProduct> {
        NewProduct::new(
            &self.product_name,
            self.price,
            self.stock,
            self.category_id,
            self.tag_ids,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, rename = "tagIds", alias = "tag_ids")]
    pub tag_ids: Option<Vec<TagId>>,
}

impl UpdateProductRequest {
    pub fn into_domain(self) -> DomainResult<ProductChanges> {
        ProductChanges::new(
            self.product_name.as_deref(),
            self.price,
            self.stock,
            self.category_id,
            self.tag_ids,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_name: String,
}

impl CategoryRequest {
    pub fn into_domain(self) -> DomainResult<CategoryName> {
        CategoryName::parse(&self.category_name)
    }
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag_name: String,
}

impl TagRequest {
    pub fn into_domain(self) -> DomainResult<TagName> {
        TagName::parse(&self.tag_name)
    }
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// Body for renames: how many rows the update touched.
pub fn updated_to_json(rows: u64) -> serde_json::Value {
    serde_json::json!({ "updated": rows })
}
