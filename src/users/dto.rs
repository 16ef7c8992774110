use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::PublicUser;
use crate::{auth::jwt::TokenPair, extract::JsonInput};

const PROFILE_FIELDS: &[&str] = &["username", "email", "password", "bio", "profile_picture"];

/// Request body for user registration. Required fields are optional here so
/// that a missing one becomes a field error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

/// Partial profile update; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    /// `None`: untouched, `Some(None)`: cleared, `Some(Some(key))`: replaced.
    #[serde(default, deserialize_with = "present")]
    pub profile_picture: Option<Option<String>>,
}

impl JsonInput for RegisterRequest {
    const STRING_FIELDS: &'static [&'static str] = PROFILE_FIELDS;
}

impl JsonInput for UpdateProfileRequest {
    const STRING_FIELDS: &'static [&'static str] = PROFILE_FIELDS;
}

fn present<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(de).map(Some)
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: &'static str,
    pub data: PublicUser,
}
