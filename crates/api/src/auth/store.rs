//! Persistence contracts consumed by the session manager and auth service.
//!
//! Each trait has one PostgreSQL implementation here (delegating to the
//! repositories in `usermgmt_db`). Unit tests use the in-process
//! implementations in `auth::memory`.

use async_trait::async_trait;
use usermgmt_core::error::CoreError;
use usermgmt_core::types::DbId;
use usermgmt_db::models::session::UserSession;
use usermgmt_db::models::user::{CreateUser, UpdateUser, User};
use usermgmt_db::repositories::{SessionRepo, UserRepo};
use usermgmt_db::DbPool;

use crate::error::{is_unique_violation, AppError};

/// Failure reported by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write. Carries the constraint name.
    #[error("duplicate value violates {0}")]
    Duplicate(String),

    #[error(transparent)]
    Database(sqlx::Error),

    /// The backing store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            let constraint = match &err {
                sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or("unknown"),
                _ => "unknown",
            };
            return StoreError::Duplicate(constraint.to_string());
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(constraint) => AppError::Core(CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            ))),
            StoreError::Database(err) => AppError::Database(err),
            StoreError::Unavailable(msg) => AppError::InternalError(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable session records: create, read by id, and the two revocations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &UserSession) -> StoreResult<()>;

    /// Returns the row regardless of revoked/expired state.
    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<UserSession>>;

    /// `true` if the session transitioned from active to revoked.
    async fn mark_revoked(&self, id: DbId) -> StoreResult<bool>;

    /// Number of sessions that transitioned.
    async fn mark_all_revoked_for_user(&self, user_id: DbId) -> StoreResult<u64>;
}

/// User rows as needed by registration, login, and the user endpoints.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, input: &CreateUser) -> StoreResult<User>;
    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn update(&self, id: DbId, input: &UpdateUser) -> StoreResult<Option<User>>;
    /// Deletes the user and, through the cascade, their sessions.
    async fn delete(&self, id: DbId) -> StoreResult<Option<User>>;
}

/// [`SessionStore`] backed by the `user_sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &UserSession) -> StoreResult<()> {
        Ok(SessionRepo::insert(&self.pool, session).await?)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<UserSession>> {
        Ok(SessionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn mark_revoked(&self, id: DbId) -> StoreResult<bool> {
        Ok(SessionRepo::mark_revoked(&self.pool, id).await?)
    }

    async fn mark_all_revoked_for_user(&self, user_id: DbId) -> StoreResult<u64> {
        Ok(SessionRepo::mark_all_revoked_for_user(&self.pool, user_id).await?)
    }
}

/// [`UserStore`] backed by the `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, input: &CreateUser) -> StoreResult<User> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&self.pool, id).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_email(&self.pool, email).await?)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(UserRepo::list(&self.pool).await?)
    }

    async fn update(&self, id: DbId, input: &UpdateUser) -> StoreResult<Option<User>> {
        Ok(UserRepo::update(&self.pool, id, input).await?)
    }

    async fn delete(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::delete(&self.pool, id).await?)
    }
}
