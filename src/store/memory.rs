//! In-process token store used by tests and local runs without Postgres.
//!
//! Mirrors the constraints the schema enforces: unique usernames, unique token secrets,
//! tokens must reference an existing user, deleting a user deletes its tokens. Uniqueness
//! is checked against committed rows and rows staged by other open transactions, so two
//! concurrent inserts of the same username cannot both succeed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, TokenStore, TokenTx};
use crate::auth::repo_types::{NewToken, NewUser, TokenOwner, User, UserToken};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tokens: HashMap<Uuid, UserToken>,
    pending_usernames: HashSet<String>,
    pending_tokens: HashSet<String>,
}

impl Tables {
    fn username_taken(&self, username: &str) -> bool {
        self.pending_usernames.contains(username)
            || self.users.values().any(|u| u.username == username)
    }

    fn token_taken(&self, token: &str) -> bool {
        self.pending_tokens.contains(token) || self.tokens.values().any(|t| t.token == token)
    }
}

#[derive(Default)]
struct Failpoints {
    user_inserts: AtomicBool,
    token_inserts: AtomicBool,
    rollbacks: AtomicBool,
}

#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tables: Arc<Mutex<Tables>>,
    failpoints: Arc<Failpoints>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent user insert fail with [`StoreError::Unavailable`].
    pub fn fail_user_inserts(&self, fail: bool) {
        self.failpoints.user_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent token insert fail with [`StoreError::Unavailable`].
    pub fn fail_token_inserts(&self, fail: bool) {
        self.failpoints.token_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make explicit rollbacks report failure. Staged rows are still discarded.
    pub fn fail_rollbacks(&self, fail: bool) {
        self.failpoints.rollbacks.store(fail, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn token_count(&self) -> usize {
        self.lock().tokens.len()
    }

    /// Tokens owned by `user_id`, oldest first.
    pub fn tokens_of(&self, user_id: Uuid) -> Vec<UserToken> {
        let mut tokens: Vec<UserToken> = self
            .lock()
            .tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by_key(|t| t.id);
        tokens
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn lookup_token_with_owner(&self, token: &str) -> Result<Option<TokenOwner>, StoreError> {
        let now = OffsetDateTime::now_utc();
        let tables = self.lock();
        let owner = tables
            .tokens
            .values()
            .find(|t| t.token == token && t.expires_at.map_or(true, |exp| exp > now))
            .and_then(|t| tables.users.get(&t.user_id))
            .map(|u| TokenOwner {
                id: u.id,
                username: u.username.clone(),
                is_staff: u.is_staff,
            });
        Ok(owner)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.tokens.retain(|_, t| t.user_id != id);
        }
        Ok(removed)
    }

    async fn begin(&self) -> Result<Box<dyn TokenTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            tables: Arc::clone(&self.tables),
            failpoints: Arc::clone(&self.failpoints),
            users: Vec::new(),
            tokens: Vec::new(),
            finished: false,
        }))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemoryTx {
    tables: Arc<Mutex<Tables>>,
    failpoints: Arc<Failpoints>,
    users: Vec<User>,
    tokens: Vec<UserToken>,
    finished: bool,
}

impl MemoryTx {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let users = std::mem::take(&mut self.users);
        let tokens = std::mem::take(&mut self.tokens);
        let mut tables = self.lock();
        for u in &users {
            tables.pending_usernames.remove(&u.username);
        }
        for t in &tokens {
            tables.pending_tokens.remove(&t.token);
        }
    }
}

#[async_trait]
impl TokenTx for MemoryTx {
    async fn insert_user(&mut self, new: NewUser<'_>) -> Result<User, StoreError> {
        if self.failpoints.user_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("user insert failed".into()));
        }
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if tables.username_taken(new.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        tables.pending_usernames.insert(new.username.to_string());
        drop(tables);

        let user = User {
            id: new.id,
            username: new.username.to_string(),
            is_staff: new.is_staff,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.push(user.clone());
        Ok(user)
    }

    async fn insert_token(&mut self, new: NewToken<'_>) -> Result<UserToken, StoreError> {
        if self.failpoints.token_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("token insert failed".into()));
        }
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let owner_exists = tables.users.contains_key(&new.user_id)
            || self.users.iter().any(|u| u.id == new.user_id);
        if !owner_exists {
            return Err(StoreError::Unavailable(format!(
                "user {} does not exist",
                new.user_id
            )));
        }
        if tables.token_taken(new.token) {
            return Err(StoreError::UniqueViolation("user_tokens_token_key".into()));
        }
        tables.pending_tokens.insert(new.token.to_string());
        drop(tables);

        let token = UserToken {
            id: new.id,
            user_id: new.user_id,
            token: new.token.to_string(),
            name: new.name.to_string(),
            expires_at: new.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        self.tokens.push(token.clone());
        Ok(token)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let users = std::mem::take(&mut self.users);
        let tokens = std::mem::take(&mut self.tokens);
        self.finished = true;

        let mut tables = self.lock();
        for u in users {
            tables.pending_usernames.remove(&u.username);
            tables.users.insert(u.id, u);
        }
        for t in tokens {
            tables.pending_tokens.remove(&t.token);
            tables.tokens.insert(t.id, t);
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.release();
        if self.failpoints.rollbacks.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("rollback failed".into()));
        }
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.release();
    }
}
