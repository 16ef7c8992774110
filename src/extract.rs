//! Request extractors that reject with `AppError` instead of axum's plain-text bodies.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, FieldErrors};

pub const NON_FIELD: &str = "non_field_errors";

/// A JSON request body whose string fields are type-checked before
/// deserialization, so a wrong type is reported against the field.
pub trait JsonInput: DeserializeOwned {
    /// Fields that must hold a string or null when present.
    const STRING_FIELDS: &'static [&'static str];

    /// Turns body problems into the error shape this endpoint answers with.
    fn reject(errors: FieldErrors) -> AppError {
        AppError::Validation(errors)
    }
}

pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: JsonInput,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                warn!(error = %rejection.body_text(), "unreadable request body");
                T::reject(FieldErrors::single(NON_FIELD, "Malformed JSON body."))
            })?;

        let Value::Object(map) = value else {
            return Err(T::reject(FieldErrors::single(
                NON_FIELD,
                "Invalid data. Expected a dictionary.",
            )));
        };

        let mut errors = FieldErrors::new();
        for &field in T::STRING_FIELDS {
            if map.get(field).is_some_and(|v| !v.is_string() && !v.is_null()) {
                errors.add(field, "Not a valid string.");
            }
        }
        if !errors.is_empty() {
            debug!(%errors, "request body has mistyped fields");
            return Err(T::reject(errors));
        }

        serde_json::from_value(Value::Object(map))
            .map(JsonBody)
            .map_err(|e| T::reject(FieldErrors::single(NON_FIELD, e.to_string())))
    }
}

/// The `:userid` path segment. Anything that is not an integer id is a
/// missing user.
pub struct UserId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection.body_text(), "non-numeric user id");
                AppError::NotFound
            })?;
        Ok(UserId(id))
    }
}
