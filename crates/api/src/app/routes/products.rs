use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_core::ProductId;

use crate::app::errors::{self, Access};
use crate::app::{dto, SharedStore};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_products().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn get_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_product(product_id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn create_product(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let input = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.create_product(input).await {
        Ok(product) => {
            tracing::info!(
                product_id = %product.product.id,
                tags = product.tags.len(),
                "product created"
            );
            (StatusCode::OK, Json(product)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn update_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let changes = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.update_product(product_id, changes).await {
        Ok(outcome) => {
            tracing::info!(
                %product_id,
                created = outcome.created.len(),
                removed = outcome.removed.len(),
                "product updated"
            );
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn delete_product(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_product(product_id).await {
        Ok(deleted) => (StatusCode::OK, Json(deleted)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Delete),
    }
}
