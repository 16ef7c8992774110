use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,                         // assigned by the store
    pub username: String,                // unique
    pub email: String,                   // unique, stored lower-cased
    #[serde(skip_serializing)]
    pub password_hash: String,           // Argon2 hash, not exposed in JSON
    pub bio: String,                     // at most 500 chars, may be empty
    pub profile_picture: Option<String>, // storage key of the uploaded picture
    pub date_joined: OffsetDateTime,
}

/// Row to insert; the id and join date come from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            bio: u.bio,
            profile_picture: u.profile_picture,
            date_joined: u.date_joined,
        }
    }
}
