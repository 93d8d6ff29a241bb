use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::identity::{AuthenticatedUser, CreateUserParams, CreatedUser};
use crate::auth::repo_types::{NewToken, NewUser};
use crate::auth::token::{generate_token_secret, DEFAULT_TOKEN_NAME};
use crate::error::AuthError;
use crate::store::{with_transaction, TokenStore};

/// Create a user and its default token. Only staff may do this.
///
/// The privilege check happens before the store is touched. User and token are written
/// in one transaction, so a failed token insert leaves no user behind.
pub async fn issue_user(
    store: &dyn TokenStore,
    actor: Option<&AuthenticatedUser>,
    params: CreateUserParams,
) -> Result<CreatedUser, AuthError> {
    let actor = actor.ok_or(AuthError::AuthorizationRequired)?;
    if !actor.is_staff {
        return Err(AuthError::InsufficientPrivilege);
    }

    let created = create_user_with_token(store, params).await?;
    info!(
        actor_id = %actor.id,
        user_id = %created.user.id,
        username = %created.user.username,
        is_staff = created.user.is_staff,
        "user created"
    );
    Ok(created)
}

/// Create the first staff user out-of-band, when no one exists yet to authorize it.
pub async fn bootstrap_staff_user(
    store: &dyn TokenStore,
    username: &str,
) -> Result<CreatedUser, AuthError> {
    create_user_with_token(
        store,
        CreateUserParams {
            username: username.to_string(),
            is_staff: true,
        },
    )
    .await
}

async fn create_user_with_token(
    store: &dyn TokenStore,
    params: CreateUserParams,
) -> Result<CreatedUser, AuthError> {
    let username = params.username.trim().to_string();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername);
    }
    let is_staff = params.is_staff;
    let user_id = Uuid::now_v7();

    with_transaction(store, move |tx| {
        Box::pin(async move {
            let user = tx
                .insert_user(NewUser {
                    id: user_id,
                    username: &username,
                    is_staff,
                })
                .await
                .map_err(|e| {
                    if e.is_unique_violation() {
                        AuthError::DuplicateUsername
                    } else {
                        AuthError::store("insert user", e)
                    }
                })?;

            let secret = generate_token_secret()?;
            let token = tx
                .insert_token(NewToken {
                    id: Uuid::now_v7(),
                    user_id: user.id,
                    token: &secret,
                    name: DEFAULT_TOKEN_NAME,
                    expires_at: None,
                })
                .await
                .map_err(|e| AuthError::store("insert token", e))?;

            Ok(CreatedUser { user, token })
        })
    })
    .await
}

/// Resolve a bearer secret to its owner.
///
/// Unknown and expired tokens produce the same error.
pub async fn authenticate(store: &dyn TokenStore, token: &str) -> Result<AuthenticatedUser, AuthError> {
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    let owner = store
        .lookup_token_with_owner(token)
        .await
        .map_err(|e| AuthError::store("lookup token", e))?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    debug!(user_id = %owner.id, "token authenticated");
    Ok(owner.into())
}
