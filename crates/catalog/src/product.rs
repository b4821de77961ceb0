use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainResult, ProductId, TagId};

use crate::category::Category;
use crate::reconcile;
use crate::tag::{ProductTag, Tag};
use crate::validate;

/// Stock assigned to a new product when the request leaves it out.
pub const DEFAULT_STOCK: i32 = 10;

/// Product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub product_name: String,
    /// Decimal price with at most two fractional digits.
    pub price: f64,
    pub stock: i32,
    pub category_id: Option<CategoryId>,
}

/// Validated input for creating a product.
///
/// Only constructible through [`NewProduct::new`], so every instance has a
/// non-empty name, a valid price/stock and a deduplicated tag list.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    product_name: String,
    price: f64,
    stock: i32,
    category_id: Option<CategoryId>,
    tag_ids: Vec<TagId>,
}

impl NewProduct {
    /// A missing `stock` falls back to [`DEFAULT_STOCK`]; missing `tag_ids`
    /// means no associations.
    pub fn new(
        product_name: &str,
        price: f64,
        stock: Option<i32>,
        category_id: Option<CategoryId>,
        tag_ids: Option<Vec<TagId>>,
    ) -> DomainResult<Self> {
        Ok(Self {
            product_name: validate::name("product_name", product_name)?,
            price: validate::price(price)?,
            stock: validate::stock(stock.unwrap_or(DEFAULT_STOCK))?,
            category_id,
            tag_ids: reconcile::dedup_tag_ids(tag_ids.as_deref()),
        })
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn stock(&self) -> i32 {
        self.stock
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    /// Distinct tag ids, ascending.
    pub fn tag_ids(&self) -> &[TagId] {
        &self.tag_ids
    }

    /// Materialize the row once the store has assigned an id.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            product_name: self.product_name,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
        }
    }
}

/// Validated partial update for a product.
///
/// Absent fields are left untouched. `tag_ids` is kept as given (possibly
/// absent) and handed to the reconciler, which treats absence as the empty set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductChanges {
    product_name: Option<String>,
    price: Option<f64>,
    stock: Option<i32>,
    category_id: Option<CategoryId>,
    tag_ids: Option<Vec<TagId>>,
}

impl ProductChanges {
    pub fn new(
        product_name: Option<&str>,
        price: Option<f64>,
        stock: Option<i32>,
        category_id: Option<CategoryId>,
        tag_ids: Option<Vec<TagId>>,
    ) -> DomainResult<Self> {
        Ok(Self {
            product_name: product_name
                .map(|n| validate::name("product_name", n))
                .transpose()?,
            price: price.map(validate::price).transpose()?,
            stock: stock.map(validate::stock).transpose()?,
            category_id,
            tag_ids,
        })
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.category_id
    }

    pub fn tag_ids(&self) -> Option<&[TagId]> {
        self.tag_ids.as_deref()
    }

    /// Apply the field changes to `product`, leaving absent fields as-is.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.product_name {
            product.product_name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
    }
}

/// Product with its category and tags resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

/// Result of a product update: the new state plus the association rows the
/// tag reconciliation created and removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductUpdateOutcome {
    pub product: ProductDetail,
    pub created: Vec<ProductTag>,
    pub removed: Vec<ProductTag>,
}
