//! In-process [`SessionStore`] and [`UserStore`] implementations.
//!
//! Backs the unit tests of the session manager and auth service. Locks are
//! held only for the duration of a map operation, never across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use usermgmt_core::types::{DbId, Timestamp};
use usermgmt_db::models::session::UserSession;
use usermgmt_db::models::user::{CreateUser, UpdateUser, User};

use super::store::{SessionStore, StoreError, StoreResult, UserStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<DbId, UserSession>>>,
    fail_inserts: Arc<AtomicBool>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent inserts fail with [`StoreError::Unavailable`].
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a stored row.
    pub fn get(&self, id: DbId) -> Option<UserSession> {
        lock(&self.sessions).get(&id).cloned()
    }

    /// All rows owned by `user_id`, in no particular order.
    pub fn sessions_for(&self, user_id: DbId) -> Vec<UserSession> {
        lock(&self.sessions)
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Overwrite a row's expiry. Returns `false` if the row does not exist.
    pub fn set_expires_at(&self, id: DbId, expires_at: Timestamp) -> bool {
        match lock(&self.sessions).get_mut(&id) {
            Some(session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &UserSession) -> StoreResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("session insert rejected".into()));
        }
        let mut sessions = lock(&self.sessions);
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Duplicate("user_sessions_pkey".into()));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<UserSession>> {
        Ok(self.get(id))
    }

    async fn mark_revoked(&self, id: DbId) -> StoreResult<bool> {
        let mut sessions = lock(&self.sessions);
        match sessions.get_mut(&id) {
            Some(session) if !session.revoked => {
                session.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_revoked_for_user(&self, user_id: DbId) -> StoreResult<u64> {
        let mut sessions = lock(&self.sessions);
        let mut count = 0;
        for session in sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && !s.revoked)
        {
            session.revoked = true;
            count += 1;
        }
        Ok(count)
    }
}

/// In-process user table. Deleting a user also removes their sessions from
/// the linked [`MemorySessionStore`], mirroring the database cascade.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<DbId, User>>>,
    sessions: Option<MemorySessionStore>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a session store so deletes cascade.
    pub fn with_sessions(sessions: MemorySessionStore) -> Self {
        Self {
            users: Arc::default(),
            sessions: Some(sessions),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, input: &CreateUser) -> StoreResult<User> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Duplicate("uq_users_email".into()));
        }
        let now = Utc::now();
        let user = User {
            id: input.id,
            name: input.name.clone(),
            email: input.email.clone(),
            age: input.age,
            password_hash: input.password_hash.clone(),
            salt: input.salt.clone(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = lock(&self.users).values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update(&self, id: DbId, input: &UpdateUser) -> StoreResult<Option<User>> {
        let mut users = lock(&self.users);
        if let Some(email) = &input.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate("uq_users_email".into()));
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            user.name = name.clone();
        }
        if let Some(email) = &input.email {
            user.email = email.clone();
        }
        if let Some(age) = input.age {
            user.age = age;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: DbId) -> StoreResult<Option<User>> {
        let removed = lock(&self.users).remove(&id);
        if removed.is_some() {
            if let Some(sessions) = &self.sessions {
                lock(&sessions.sessions).retain(|_, s| s.user_id != id);
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn session(user_id: DbId) -> UserSession {
        let now = Utc::now();
        UserSession {
            id: Uuid::new_v4(),
            user_id,
            hashed_refresh_token: "hash".into(),
            device_id: "d1".into(),
            device_ua: "ua".into(),
            device_ip: String::new(),
            issued_at: now,
            expires_at: now + Duration::days(1),
            revoked: false,
        }
    }

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            id: Uuid::new_v4(),
            name: "n".into(),
            email: email.into(),
            age: 20,
            password_hash: "h".into(),
            salt: "s".into(),
        }
    }

    #[tokio::test]
    async fn revocation_reports_transition_once() {
        let store = MemorySessionStore::new();
        let s = session(Uuid::new_v4());
        store.insert(&s).await.unwrap();

        assert!(store.mark_revoked(s.id).await.unwrap());
        assert!(!store.mark_revoked(s.id).await.unwrap());
        assert!(!store.mark_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn bulk_revocation_counts_only_active_rows() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        let (a, b) = (session(user), session(user));
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();
        store.insert(&session(Uuid::new_v4())).await.unwrap();
        store.mark_revoked(a.id).await.unwrap();

        assert_eq!(store.mark_all_revoked_for_user(user).await.unwrap(), 1);
        assert!(store.sessions_for(user).iter().all(|s| s.revoked));
    }

    #[tokio::test]
    async fn failing_inserts_surface_as_unavailable() {
        let store = MemorySessionStore::new();
        store.fail_inserts(true);
        let err = store.insert(&session(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let users = MemoryUserStore::new();
        users.create(&new_user("x@test.com")).await.unwrap();
        let err = users.create(&new_user("x@test.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(c) if c == "uq_users_email"));
    }

    #[tokio::test]
    async fn delete_cascades_to_linked_sessions() {
        let sessions = MemorySessionStore::new();
        let users = MemoryUserStore::with_sessions(sessions.clone());
        let user = users.create(&new_user("y@test.com")).await.unwrap();
        let s = session(user.id);
        sessions.insert(&s).await.unwrap();

        users.delete(user.id).await.unwrap();
        assert!(sessions.get(s.id).is_none());
    }
}
