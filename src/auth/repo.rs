use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::repo_types::{NewToken, NewUser, TokenOwner, User, UserToken};

impl User {
    /// Insert a user inside an open transaction.
    pub async fn insert(conn: &mut PgConnection, new: NewUser<'_>) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, is_staff)
            VALUES ($1, $2, $3)
            RETURNING id, username, is_staff, created_at
            "#,
        )
        .bind(new.id)
        .bind(new.username)
        .bind(new.is_staff)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_staff, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Delete a user; tokens go with it via ON DELETE CASCADE.
    pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl UserToken {
    /// Insert a token inside an open transaction.
    pub async fn insert(conn: &mut PgConnection, new: NewToken<'_>) -> sqlx::Result<UserToken> {
        sqlx::query_as::<_, UserToken>(
            r#"
            INSERT INTO user_tokens (id, user_id, token, name, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token, name, expires_at, created_at
            "#,
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.token)
        .bind(new.name)
        .bind(new.expires_at)
        .fetch_one(conn)
        .await
    }
}

impl TokenOwner {
    /// Resolve a live token to its owner in one query; expired rows never leave the database.
    pub async fn find_by_token(db: &PgPool, token: &str) -> sqlx::Result<Option<TokenOwner>> {
        sqlx::query_as::<_, TokenOwner>(
            r#"
            SELECT u.id, u.username, u.is_staff
              FROM user_tokens t
              JOIN users u ON u.id = t.user_id
             WHERE t.token = $1
               AND (t.expires_at IS NULL OR t.expires_at > now())
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await
    }
}
