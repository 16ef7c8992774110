use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::repo_types::{NewUser, User};

/// Columns with a unique constraint on `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn field(self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            UniqueField::Username => "A user with that username already exists.",
            UniqueField::Email => "user with this email address already exists.",
        }
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("duplicate {}", .0.field())]
    Duplicate(UniqueField),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Persistence for user records. `Ok(None)` means the id does not resolve.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User, RepoError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    /// Writes every mutable column of `user` back to its row.
    async fn update(&self, user: &User) -> Result<Option<User>, RepoError>;
    /// Removes the row and hands back what was deleted.
    async fn delete(&self, id: i64) -> Result<Option<User>, RepoError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, bio, profile_picture, date_joined";

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            match db.constraint() {
                Some("users_username_key") => return RepoError::Duplicate(UniqueField::Username),
                Some("users_email_key") => return RepoError::Duplicate(UniqueField::Email),
                _ => {}
            }
        }
    }
    RepoError::Db(e)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new: NewUser) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, bio, profile_picture)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.bio)
        .bind(&new.profile_picture)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<Option<User>, RepoError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username = $2, email = $3, password_hash = $4, bio = $5, profile_picture = $6
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<Option<User>, RepoError> {
        let deleted = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }
}
