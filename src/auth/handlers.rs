use axum::{extract::State, routing::post, Json, Router};

use crate::{
    auth::{dto::LoginRequest, jwt::TokenPair, services},
    error::AppError,
    extract::JsonBody,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/users/login", post(login))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let tokens = services::login(&state, payload).await?;
    Ok(Json(tokens))
}
