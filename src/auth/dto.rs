use serde::Deserialize;

use crate::{
    error::{AppError, FieldErrors},
    extract::JsonInput,
};

/// Request body for login. Both fields are optional so a missing one can be
/// reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl JsonInput for LoginRequest {
    const STRING_FIELDS: &'static [&'static str] = &["username", "password"];

    fn reject(errors: FieldErrors) -> AppError {
        tracing::debug!(%errors, "login body rejected");
        AppError::BadRequest("Invalid request body.".into())
    }
}
