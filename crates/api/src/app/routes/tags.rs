use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use storefront_core::TagId;

use crate::app::errors::{self, Access};
use crate::app::{dto, SharedStore};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", get(get_tag).put(update_tag).delete(delete_tag))
}

pub async fn list_tags(Extension(store): Extension<SharedStore>) -> axum::response::Response {
    match store.list_tags().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn get_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tag_id: TagId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.get_tag(tag_id).await {
        Ok(Some(tag)) => (StatusCode::OK, Json(tag)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "tag not found"),
        Err(e) => errors::store_error_to_response(e, Access::Read),
    }
}

pub async fn create_tag(
    Extension(store): Extension<SharedStore>,
    body: Result<Json<dto::TagRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };
    let name = match body.into_domain() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match store.create_tag(name).await {
        Ok(tag) => (StatusCode::OK, Json(tag)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn update_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
    body: Result<Json<dto::TagRequest>, JsonRejection>,
) -> axum::response::Response {
    let tag_id: TagId = match errors::parse_id(&id) {
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

    match store.update_tag(tag_id, name).await {
        Ok(updated) => (StatusCode::OK, Json(dto::updated_to_json(updated))).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Write),
    }
}

pub async fn delete_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tag_id: TagId = match errors::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match store.delete_tag(tag_id).await {
        Ok(deleted) => (StatusCode::OK, Json(deleted)).into_response(),
        Err(e) => errors::store_error_to_response(e, Access::Delete),
    }
}
