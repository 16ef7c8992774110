use axum::extract::FromRef;
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{RegisterRequest, RegisterResponse, UpdateProfileRequest},
    repo::UniqueField,
    repo_types::{NewUser, PublicUser, User},
};
use crate::{
    auth::{jwt::JwtKeys, password::hash_password_blocking},
    error::{AppError, FieldErrors},
    state::AppState,
};

/// Storage prefix for uploaded pictures.
pub const PICTURE_PREFIX: &str = "profile_pictures/";

const FOREIGN_PICTURE: &str = "Upload pictures through the profile-picture endpoint.";

/// Keys minted for `user_id` live under this prefix; nothing else is ever deleted.
fn owned_prefix(user_id: i64) -> String {
    format!("{PICTURE_PREFIX}{user_id}/")
}

/// True when `key` points into the upload area but not at `owner`'s own objects.
fn is_foreign_picture(key: &str, owner: Option<i64>) -> bool {
    key.starts_with(PICTURE_PREFIX)
        && owner.map_or(true, |id| !key.starts_with(&owned_prefix(id)))
}

/// Uploaded picture as received from the client.
pub struct PictureUpload {
    pub body: Bytes,
    pub content_type: String,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

async fn ensure_unique(
    st: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<i64>,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if let Some(username) = username {
        if let Some(other) = st.users.find_by_username(username).await? {
            if Some(other.id) != except {
                errors.add("username", UniqueField::Username.message());
            }
        }
    }
    if let Some(email) = email {
        if let Some(other) = st.users.find_by_email(email).await? {
            if Some(other.id) != except {
                errors.add("email", UniqueField::Email.message());
            }
        }
    }
    Ok(errors.into_result(())?)
}

/// Drops a picture we stored earlier for `owner`. Failures are logged, never surfaced.
async fn discard_picture(st: &AppState, owner: i64, key: Option<&str>) {
    let prefix = owned_prefix(owner);
    let Some(key) = key.filter(|k| k.starts_with(&prefix)) else {
        return;
    };
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to remove profile picture");
    }
}

async fn load(st: &AppState, user_id: i64) -> Result<User, AppError> {
    match st.users.get_by_id(user_id).await? {
        Some(user) => Ok(user),
        None => {
            error!(user_id, "user with id not found");
            Err(AppError::NotFound)
        }
    }
}

#[instrument(skip(st, payload))]
pub async fn register(st: &AppState, payload: RegisterRequest) -> Result<RegisterResponse, AppError> {
    let input = payload.validate().map_err(|errors| {
        warn!(%errors, "registration rejected");
        AppError::Validation(errors)
    })?;
    if input
        .profile_picture
        .as_deref()
        .is_some_and(|key| is_foreign_picture(key, None))
    {
        return Err(FieldErrors::single("profile_picture", FOREIGN_PICTURE).into());
    }

    ensure_unique(st, Some(input.username.as_str()), Some(input.email.as_str()), None).await?;

    let password_hash = hash_password_blocking(input.password).await?;
    let user = st
        .users
        .create(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
            bio: input.bio,
            profile_picture: input.profile_picture,
        })
        .await?;

    let tokens = JwtKeys::from_ref(st).issue_pair(user.id)?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(RegisterResponse {
        user: user.into(),
        tokens,
    })
}

#[instrument(skip(st))]
pub async fn get_profile(st: &AppState, user_id: i64) -> Result<PublicUser, AppError> {
    Ok(load(st, user_id).await?.into())
}

#[instrument(skip(st, payload))]
pub async fn update_profile(
    st: &AppState,
    user_id: i64,
    payload: UpdateProfileRequest,
) -> Result<PublicUser, AppError> {
    let changes = payload.validate()?;
    if let Some(Some(key)) = &changes.profile_picture {
        if is_foreign_picture(key, Some(user_id)) {
            warn!(user_id, key = %key, "refused picture key outside the caller's area");
            return Err(FieldErrors::single("profile_picture", FOREIGN_PICTURE).into());
        }
    }
    let mut user = load(st, user_id).await?;

    let new_username = changes.username.as_deref().filter(|u| *u != user.username);
    let new_email = changes.email.as_deref().filter(|e| *e != user.email);
    ensure_unique(st, new_username, new_email, Some(user_id)).await?;

    let old_picture = user.profile_picture.clone();
    if let Some(username) = changes.username {
        user.username = username;
    }
    if let Some(email) = changes.email {
        user.email = email;
    }
    if let Some(bio) = changes.bio {
        user.bio = bio;
    }
    if let Some(picture) = changes.profile_picture {
        user.profile_picture = picture;
    }
    if let Some(password) = changes.password {
        user.password_hash = hash_password_blocking(password).await?;
    }

    let saved = st.users.update(&user).await?.ok_or(AppError::NotFound)?;
    if old_picture != saved.profile_picture {
        discard_picture(st, user_id, old_picture.as_deref()).await;
    }

    info!(user_id, "user profile updated");
    Ok(saved.into())
}

#[instrument(skip(st))]
pub async fn delete_profile(st: &AppState, user_id: i64) -> Result<(), AppError> {
    let Some(deleted) = st.users.delete(user_id).await? else {
        error!(user_id, "user with id not found");
        return Err(AppError::NotFound);
    };
    discard_picture(st, user_id, deleted.profile_picture.as_deref()).await;
    info!(user_id, username = %deleted.username, "user deleted");
    Ok(())
}

#[instrument(skip(st, upload), fields(content_type = %upload.content_type, bytes = upload.body.len()))]
pub async fn set_profile_picture(
    st: &AppState,
    user_id: i64,
    upload: PictureUpload,
) -> Result<PublicUser, AppError> {
    let Some(ext) = ext_from_mime(&upload.content_type) else {
        return Err(FieldErrors::single(
            "profile_picture",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        )
        .into());
    };
    if upload.body.is_empty() {
        return Err(FieldErrors::single("profile_picture", "The submitted file is empty.").into());
    }

    let mut user = load(st, user_id).await?;
    let key = format!("{}{}.{ext}", owned_prefix(user_id), Uuid::new_v4());
    st.storage
        .put_object(&key, upload.body, &upload.content_type)
        .await?;

    let old_picture = user.profile_picture.replace(key.clone());
    let saved = match st.users.update(&user).await {
        Ok(Some(saved)) => saved,
        other => {
            discard_picture(st, user_id, Some(&key)).await;
            return Err(match other {
                Err(e) => e.into(),
                _ => AppError::NotFound,
            });
        }
    };
    discard_picture(st, user_id, old_picture.as_deref()).await;

    info!(user_id, key = %key, "profile picture stored");
    Ok(saved.into())
}
