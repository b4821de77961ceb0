use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_core::CategoryId;

use crate::app::errors::{self, Access};
use crate::app::{dto, SharedStore};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_categories(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_categories().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn get_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let category_id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_category(category_id).await {
        Ok(Some(category)) => (StatusCode::OK, Json(category)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "category not found"),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn create_category(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<dto::CategoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let name = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.create_category(name).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn update_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<dto::CategoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let category_id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let name = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.update_category(category_id, name).await {
        Ok(updated) => (StatusCode::OK, Json(dto::updated_to_json(updated))).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn delete_category(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let category_id: CategoryId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_category(category_id).await {
        Ok(deleted) => (StatusCode::OK, Json(deleted)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Delete),
    }
}
