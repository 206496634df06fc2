//! JSON request bodies rejected in the API's own error format
//!
//! axum's `Json` answers a body it cannot deserialize with a plain-text 422.
//! [`JsonBody`] turns the same failures into a 400 validation error keyed by
//! the offending top-level field, like every other rejected payload.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use foodgram_common::errors::{AppError, ErrorCode, ValidationErrors};
use serde::de::DeserializeOwned;

/// Key for errors that belong to the body as a whole
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A deserialized JSON body. Take it as `Result<JsonBody<T>, AppError>` when
/// authentication has to be checked before the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_errors(&rejection).into()),
        }
    }
}

fn rejection_errors(rejection: &JsonRejection) -> ValidationErrors {
    match rejection {
        JsonRejection::JsonDataError(_) => {
            let (field, message) = data_error_field(&rejection.body_text());
            ValidationErrors::single(&field, ErrorCode::InvalidFormat, message)
        }
        JsonRejection::JsonSyntaxError(_) => ValidationErrors::single(
            NON_FIELD_ERRORS,
            ErrorCode::InvalidFormat,
            "request body is not valid JSON",
        ),
        JsonRejection::MissingJsonContentType(_) => ValidationErrors::single(
            NON_FIELD_ERRORS,
            ErrorCode::InvalidFormat,
            "expected Content-Type: application/json",
        ),
        _ => ValidationErrors::single(NON_FIELD_ERRORS, ErrorCode::InvalidFormat, rejection.body_text()),
    }
}

/// Split axum's data error text into the top-level field and a message.
///
/// The text reads `Failed to deserialize ...: <path>: <error> at line L column C`,
/// where `<path>` (e.g. `ingredients[0].amount`) is left out for errors at the
/// root. A missing field at the root is keyed by that field.
fn data_error_field(body_text: &str) -> (String, String) {
    let detail = body_text
        .split_once("target type: ")
        .map_or(body_text, |(_, detail)| detail);
    let detail = detail
        .rsplit_once(" at line ")
        .map_or(detail, |(detail, _)| detail);

    if let Some((path, message)) = detail.split_once(": ") {
        if is_path(path) {
            return (top_level(path).to_string(), message.to_string());
        }
    }

    let field = detail
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map_or(NON_FIELD_ERRORS, |(field, _)| field);
    (field.to_string(), detail.to_string())
}

fn is_path(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

fn top_level(path: &str) -> &str {
    path.split(['.', '[']).next().unwrap_or(path)
}
