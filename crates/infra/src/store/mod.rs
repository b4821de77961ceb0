//! Catalog storage boundary.
//!
//! `CatalogStore` is the only way the HTTP layer touches persistent state.
//! Every multi-step write (product create/update) is atomic: either all of
//! its row changes land or none do.
//!
//! ## Error Mapping
//!
//! | Failure | `StoreError` |
//! |---------|--------------|
//! | Input rejected by domain rules | `Domain` |
//! | Unique / foreign key / check / not-null violation | `Constraint` |
//! | Target row missing where one is required | `NotFound` |
//! | Pool, network, decode or other backend failure | `Backend` |

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{
    Category, CategoryDetail, CategoryName, NewProduct, ProductChanges, ProductDetail,
    ProductUpdateOutcome, Tag, TagDetail, TagName,
};
use storefront_core::{CategoryId, DomainError, ProductId, TagId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The write would break a relational constraint (e.g. unknown tag id).
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("not found")]
    NotFound,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Products, categories and tags, with product/tag associations maintained
/// as a side effect of product writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products ordered by id, with category and tags resolved.
    async fn list_products(&self) -> StoreResult<Vec<ProductDetail>>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<ProductDetail>>;

    /// Insert the product and one association per tag id, atomically.
    async fn create_product(&self, input: NewProduct) -> StoreResult<ProductDetail>;

    /// Update fields and reconcile tags in one atomic unit.
    ///
    /// Returns `StoreError::NotFound` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> StoreResult<ProductUpdateOutcome>;

    /// Returns the number of deleted rows (0 when the id is unknown).
    async fn delete_product(&self, id: ProductId) -> StoreResult<u64>;

    async fn list_categories(&self) -> StoreResult<Vec<CategoryDetail>>;

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<CategoryDetail>>;

    async fn create_category(&self, name: CategoryName) -> StoreResult<Category>;

    /// Returns the number of updated rows.
    async fn update_category(&self, id: CategoryId, name: CategoryName) -> StoreResult<u64>;

    /// Products in the category keep existing with no category.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<u64>;

    async fn list_tags(&self) -> StoreResult<Vec<TagDetail>>;

    async fn get_tag(&self, id: TagId) -> StoreResult<Option<TagDetail>>;

    async fn create_tag(&self, name: TagName) -> StoreResult<Tag>;

    async fn update_tag(&self, id: TagId, name: TagName) -> StoreResult<u64>;

    /// Associations to the tag are removed with it.
    async fn delete_tag(&self, id: TagId) -> StoreResult<u64>;
}
