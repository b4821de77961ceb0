//! Infrastructure layer: catalog storage backends.

pub mod store;

pub use store::{
    CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult,
};
