//! Persistence of users and their bearer tokens.
//!
//! [`TokenStore`] is the read side plus a way to open a [`TokenTx`]; every write goes
//! through a transaction. [`with_transaction`] wraps a unit of work so that it either
//! commits as a whole or leaves nothing behind.

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::auth::repo_types::{NewToken, NewUser, TokenOwner, User, UserToken};
use crate::error::AuthError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryTokenStore;
pub use postgres::PgTokenStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Owner of a token that exists and has not expired.
    async fn lookup_token_with_owner(&self, token: &str) -> Result<Option<TokenOwner>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Returns false when no such user exists. Tokens are removed with the user.
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn begin(&self) -> Result<Box<dyn TokenTx>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Write side of the store, bound to one open transaction.
///
/// Dropping a transaction without calling [`TokenTx::commit`] discards its writes.
#[async_trait]
pub trait TokenTx: Send {
    async fn insert_user(&mut self, new: NewUser<'_>) -> Result<User, StoreError>;

    async fn insert_token(&mut self, new: NewToken<'_>) -> Result<UserToken, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Run `f` inside a transaction: commit when it returns `Ok`, roll back otherwise.
///
/// A failed rollback is logged; the error from `f` is what the caller sees.
pub async fn with_transaction<T, F>(store: &dyn TokenStore, f: F) -> Result<T, AuthError>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut dyn TokenTx) -> BoxFuture<'c, Result<T, AuthError>> + Send,
{
    let mut tx = store
        .begin()
        .await
        .map_err(|e| AuthError::store("begin transaction", e))?;

    let outcome = f(&mut *tx).await;
    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| AuthError::store("commit transaction", e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "failed to rollback transaction");
            }
            Err(err)
        }
    }
}
