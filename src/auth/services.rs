use axum::extract::FromRef;
use tracing::{info, instrument, warn};

use super::{
    dto::LoginRequest,
    jwt::{JwtKeys, TokenPair},
    password::check_password,
};
use crate::{error::AppError, state::AppState};

/// Checks credentials and issues a fresh token pair. Unknown usernames and
/// wrong passwords fail identically.
#[instrument(skip(st, payload))]
pub async fn login(st: &AppState, payload: LoginRequest) -> Result<TokenPair, AppError> {
    let username = payload.username.ok_or(AppError::MissingField("username"))?;
    let password = payload.password.ok_or(AppError::MissingField("password"))?;

    // Argon2 runs whether or not the account exists.
    let user = st.users.find_by_username(&username).await?;
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let matched = check_password(password, stored).await?;

    let Some(user) = user.filter(|_| matched) else {
        warn!(username = %username, "failed login attempt");
        return Err(AppError::InvalidCredentials);
    };

    let tokens = JwtKeys::from_ref(st).issue_pair(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok(tokens)
}
