use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::warn;

use super::identity::AuthenticatedUser;
use super::services::authenticate;
use crate::error::AuthError;
use crate::store::TokenStore;

/// Authenticated caller; rejects requests without a valid bearer token.
pub struct AuthUser(pub AuthenticatedUser);

/// Caller if an `Authorization` header was sent, `None` otherwise.
///
/// A header that is present but invalid is still rejected.
pub struct MaybeAuthUser(pub Option<AuthenticatedUser>);

/// Pull the secret out of `Authorization: Bearer <secret>`.
///
/// `Ok(None)` when the header is absent.
pub(crate) fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AuthError::MissingToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthError::MissingToken)?;
    Ok(Some(token.trim()))
}

async fn resolve<S>(parts: &Parts, state: &S) -> Result<Option<AuthenticatedUser>, AuthError>
where
    Arc<dyn TokenStore>: FromRef<S>,
{
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let store = Arc::<dyn TokenStore>::from_ref(state);
    match authenticate(store.as_ref(), token).await {
        Ok(user) => Ok(Some(user)),
        Err(e) => {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                "authentication failed"
            );
            Err(e)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn TokenStore>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(AuthUser)
            .ok_or(AuthError::AuthorizationRequired)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<dyn TokenStore>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(resolve(parts, state).await?))
    }
}
