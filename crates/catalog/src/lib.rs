//! Catalog domain module.
//!
//! This crate contains the business rules for products, categories, tags and
//! the product/tag association, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;
pub mod reconcile;
pub mod tag;

mod validate;

pub use category::{Category, CategoryDetail, CategoryName};
pub use product::{
    NewProduct, Product, ProductChanges, ProductDetail, ProductUpdateOutcome, DEFAULT_STOCK,
};
pub use reconcile::{reconcile_associations, reconcile_tag_ids, AssociationDiff, TagDiff};
pub use tag::{ProductTag, Tag, TagDetail, TagName};
