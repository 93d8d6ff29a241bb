use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{TokenOwner, User, UserToken};

/// Caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl From<TokenOwner> for AuthenticatedUser {
    fn from(row: TokenOwner) -> Self {
        Self {
            id: row.id,
            username: row.username,
            is_staff: row.is_staff,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub is_staff: bool,
}

/// A freshly created user together with its first token.
#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: User,
    pub token: UserToken,
}
