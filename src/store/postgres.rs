use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{StoreError, TokenStore, TokenTx};
use crate::auth::repo_types::{NewToken, NewUser, TokenOwner, User, UserToken};
use crate::config::PoolConfig;

#[derive(Clone)]
pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a pool with the given limits and make sure the database answers.
    pub async fn connect(database_url: &str, pool: &PoolConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(pool.max_connections)
            .min_connections(pool.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(pool.acquire_timeout_secs))
            .max_lifetime(PoolConfig::MAX_LIFETIME)
            .idle_timeout(PoolConfig::IDLE_TIMEOUT)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn lookup_token_with_owner(&self, token: &str) -> Result<Option<TokenOwner>, StoreError> {
        Ok(TokenOwner::find_by_token(&self.db, token).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.db, id).await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(User::delete(&self.db, id).await?)
    }

    async fn begin(&self) -> Result<Box<dyn TokenTx>, StoreError> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTokenTx { tx }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

/// sqlx rolls the transaction back when it is dropped uncommitted.
struct PgTokenTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TokenTx for PgTokenTx {
    async fn insert_user(&mut self, new: NewUser<'_>) -> Result<User, StoreError> {
        Ok(User::insert(&mut self.tx, new).await?)
    }

    async fn insert_token(&mut self, new: NewToken<'_>) -> Result<UserToken, StoreError> {
        Ok(UserToken::insert(&mut self.tx, new).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(self.tx.commit().await?)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(self.tx.rollback().await?)
    }
}
