use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Extracts and validates a bearer access token, yielding the user ID.
pub struct AuthUser(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

impl AuthUser {
    /// Only the account owner may act on `target`.
    pub fn ensure_owner(&self, target: i64) -> Result<(), AppError> {
        if self.0 == target {
            Ok(())
        } else {
            warn!(caller = self.0, target, "refused action on another user's profile");
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use axum::http::{header::AUTHORIZATION, Request};

    #[derive(Clone)]
    struct KeysOnly(JwtKeys);

    impl FromRef<KeysOnly> for JwtKeys {
        fn from_ref(state: &KeysOnly) -> Self {
            state.0.clone()
        }
    }

    fn state() -> KeysOnly {
        KeysOnly(JwtKeys::from(&JwtConfig {
            secret: "extractor-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        }))
    }

    async fn extract(state: &KeysOnly, header: Option<String>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn accepts_access_token() {
        let st = state();
        let token = st.0.sign_access(11).unwrap();
        let AuthUser(id) = extract(&st, Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(id, 11);
    }

    #[tokio::test]
    async fn rejects_missing_garbled_and_refresh_tokens() {
        let st = state();
        let refresh = st.0.sign_refresh(11).unwrap();
        for header in [
            None,
            Some("Token abc".to_string()),
            Some("Bearer not-a-jwt".to_string()),
            Some(format!("Bearer {refresh}")),
        ] {
            let err = extract(&st, header).await.err().expect("should reject");
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
    }

    #[test]
    fn ensure_owner_compares_ids() {
        assert!(AuthUser(3).ensure_owner(3).is_ok());
        assert!(matches!(AuthUser(3).ensure_owner(4), Err(AppError::Forbidden)));
    }
}
