//! HTTP API application wiring (Axum router + store wiring).
//!
//! Layout:
//! - `services.rs`: storage backend selection and startup
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::SharedStore;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(store: SharedStore) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_span))
                .layer(Extension(store)),
        )
}
