use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Bearer token owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String, // bearer secret
    pub name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>, // None never expires
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Row returned by the token lookup joined with its owner.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TokenOwner {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

pub struct NewUser<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub is_staff: bool,
}

pub struct NewToken<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: &'a str,
    pub name: &'a str,
    pub expires_at: Option<OffsetDateTime>,
}
