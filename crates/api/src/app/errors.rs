use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_infra::StoreError;

/// Body returned for any failure that must not leak backend details.
pub const GENERIC_ERROR_MESSAGE: &str = "Oops, we encountered an error. Try again later.";

/// What the failing handler was doing.
///
/// Backend failures on a create/update are reported as a 400 database error
/// with the backend message; on a read or delete they are a logged 500 with a
/// generic body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Delete,
}

pub fn store_error_to_response(err: StoreError, access: Access) -> axum::response::Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Constraint(msg) => {
            json_error(StatusCode::BAD_REQUEST, "constraint_violation", msg)
        }
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Backend(msg) => match access {
            Access::Write => {
                tracing::warn!(error = %msg, "write rejected by storage backend");
                json_error(StatusCode::BAD_REQUEST, "database_error", msg)
            }
            Access::Read | Access::Delete => {
                tracing::error!(error = %msg, ?access, "storage backend failure");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    GENERIC_ERROR_MESSAGE,
                )
            }
        },
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed or mistyped JSON bodies are client errors.
pub fn body_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

/// Parse a `:id` path segment into a typed id, or a 400 response.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(domain_error_to_response)
}
