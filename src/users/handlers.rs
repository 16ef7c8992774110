use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::{
    dto::{RegisterRequest, RegisterResponse, UpdateProfileRequest, UpdateProfileResponse},
    repo_types::PublicUser,
    services::{self, PictureUpload},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, FieldErrors},
    extract::{JsonBody, UserId},
    state::AppState,
};

const PICTURE_BODY_LIMIT: usize = 5 * 1024 * 1024;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route(
            "/users/:userid",
            get(get_profile)
                .put(update_profile)
                .patch(update_profile)
                .delete(delete_profile),
        )
        .route(
            "/users/:userid/profile-picture",
            put(upload_profile_picture).layer(DefaultBodyLimit::max(PICTURE_BODY_LIMIT)),
        )
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let created = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    UserId(userid): UserId,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(services::get_profile(&state, userid).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    UserId(userid): UserId,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    caller.ensure_owner(userid)?;
    let data = services::update_profile(&state, userid, payload).await?;
    Ok(Json(UpdateProfileResponse {
        message: "User has been updated successfully.",
        data,
    }))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    UserId(userid): UserId,
) -> Result<StatusCode, AppError> {
    caller.ensure_owner(userid)?;
    services::delete_profile(&state, userid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /users/:userid/profile-picture (multipart, field `file`)
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    caller: AuthUser,
    UserId(userid): UserId,
    mut mp: Multipart,
) -> Result<Json<PublicUser>, AppError> {
    caller.ensure_owner(userid)?;

    let malformed = || AppError::from(FieldErrors::single("profile_picture", "Malformed upload."));
    let mut upload = None;
    while let Some(field) = mp.next_field().await.map_err(|_| malformed())? {
        if !matches!(field.name(), Some("file") | Some("profile_picture")) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field.bytes().await.map_err(|_| malformed())?;
        upload = Some(PictureUpload { body, content_type });
        break;
    }

    let upload = upload.ok_or_else(|| {
        AppError::from(FieldErrors::single("profile_picture", "No file was submitted."))
    })?;
    Ok(Json(services::set_profile_picture(&state, userid, upload).await?))
}
