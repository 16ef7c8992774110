//! Error taxonomy shared by the services and its mapping onto HTTP responses.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::repo::RepoError;

/// Field name -> messages, serialized as `{"email": ["Enter a valid email address."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Wrong Credentials")]
    InvalidCredentials,
    #[error("User not found.")]
    NotFound,
    #[error("{0}")]
    Unauthorized(String),
    #[error("You may only modify your own profile.")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(field) => {
                AppError::Validation(FieldErrors::single(field.field(), field.message()))
            }
            RepoError::Db(e) => AppError::Internal(e.into()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MissingField(_)
            | AppError::BadRequest(_)
            | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(fields) => (status, Json(fields)).into_response(),
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("username", "This field may not be blank.");
        errors.add("username", "second");
        errors.add("email", "Enter a valid email address.");

        assert_eq!(errors.get("username").unwrap().len(), 2);
        assert_eq!(errors.get("email").unwrap(), ["Enter a valid email address."]);
        assert!(errors.get("bio").is_none());
        assert!(errors.clone().into_result(()).is_err());
        assert!(FieldErrors::new().into_result(7).is_ok());
    }

    #[tokio::test]
    async fn validation_renders_field_map() {
        let res = AppError::from(FieldErrors::single("email", "taken")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "email": ["taken"] }));
    }

    #[tokio::test]
    async fn credentials_and_missing_field_render_error_key() {
        let res = AppError::InvalidCredentials.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Wrong Credentials" }));

        let res = AppError::MissingField("password").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Missing field: password" }));

        let res = AppError::BadRequest("Invalid request body.".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Invalid request body." }));
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let res = AppError::Internal(anyhow::anyhow!("db exploded at row 7")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(res).await;
        assert!(!body.to_string().contains("exploded"));
    }

    #[test]
    fn duplicate_rows_become_field_errors() {
        use crate::users::repo::UniqueField;

        let err = AppError::from(RepoError::Duplicate(UniqueField::Username));
        let AppError::Validation(fields) = err else { panic!("expected validation error") };
        assert_eq!(
            fields.get("username").unwrap(),
            ["A user with that username already exists."]
        );
        assert!(matches!(
            AppError::from(RepoError::Db(sqlx::Error::RowNotFound)),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Unauthorized("nope".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
