use std::sync::Arc;

use storefront_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreResult};

use crate::config::StoreConfig;

/// Store handle shared by every handler.
pub type SharedStore = Arc<dyn CatalogStore>;

pub async fn build_store(config: &StoreConfig) -> StoreResult<SharedStore> {
    match config {
        StoreConfig::InMemory => {
            tracing::warn!("using in-memory catalog store; data is lost on restart");
            Ok(Arc::new(InMemoryCatalogStore::new()))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
            apply_schema,
        } => {
            let store = PostgresCatalogStore::connect(database_url, *max_connections).await?;
            if *apply_schema {
                store.apply_schema().await?;
            }
            tracing::info!(max_connections, "connected to postgres catalog store");
            Ok(Arc::new(store))
        }
    }
}
