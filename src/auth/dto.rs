use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::identity::{AuthenticatedUser, CreatedUser};

/// Request body for user creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub is_staff: bool,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl From<AuthenticatedUser> for PublicUser {
    fn from(u: AuthenticatedUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            is_staff: u.is_staff,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub id: Uuid,
    pub token: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Stored user row as returned on creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Response returned after a user is created; the only time the secret is shown.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub user: UserResponse,
    pub token: TokenResponse,
}

impl From<CreatedUser> for CreatedUserResponse {
    fn from(c: CreatedUser) -> Self {
        Self {
            user: UserResponse {
                id: c.user.id,
                username: c.user.username,
                is_staff: c.user.is_staff,
                created_at: c.user.created_at,
            },
            token: TokenResponse {
                id: c.token.id,
                token: c.token.token,
                name: c.token.name,
                expires_at: c.token.expires_at,
                created_at: c.token.created_at,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
