//! Auth orchestrator and user operations.
//!
//! Composes the credential verifier, the user store, and the
//! [`SessionManager`]. Handlers stay thin and call into this service.

use std::sync::Arc;

use serde::Deserialize;
use usermgmt_core::device::DeviceInfo;
use usermgmt_core::error::CoreError;
use usermgmt_core::password_policy::validate_password_complexity;
use usermgmt_core::types::DbId;
use usermgmt_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use uuid::Uuid;
use validator::Validate;

use super::password::{derive_password_hash, generate_salt, verify_password};
use super::run_blocking;
use super::session::{SessionManager, TokenPair};
use super::store::UserStore;
use crate::error::{AppError, AppResult};

/// Same message for unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body for `POST /auth/register` and `POST /users`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(range(min = 13))]
    pub age: i32,
}

/// Body for `POST /auth/login`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email, length(max = 100))]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Body for `PUT /users/{id}`. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email, length(max = 100))]
    pub email: Option<String>,
    #[validate(range(min = 13))]
    pub age: Option<i32>,
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            age: req.age,
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Register a new account.
    ///
    /// Beyond field validation the only password rule is mixed case.
    pub async fn register(&self, input: RegisterRequest) -> AppResult<UserResponse> {
        validate_password_complexity(&input.password)?;
        self.create_user(input).await
    }

    /// Authenticate by email + password and open a session on `device`.
    ///
    /// Unknown email, wrong password, and an unreadable stored hash all
    /// produce the same `Unauthorized`.
    pub async fn login(&self, input: LoginRequest, device: &DeviceInfo) -> AppResult<TokenPair> {
        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

        let (password, salt, hash) = (input.password, user.salt.clone(), user.password_hash.clone());
        let verified = run_blocking(move || verify_password(&password, &salt, &hash)).await?;
        match verified {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user_id = %user.id, "Login rejected: password mismatch");
                return Err(AppError::unauthorized(INVALID_CREDENTIALS));
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Login rejected: stored hash unusable");
                return Err(AppError::unauthorized(INVALID_CREDENTIALS));
            }
        }

        self.sessions.issue_token_pair(user.id, device).await
    }

    /// Revoke the caller's current session.
    pub async fn logout(&self, session_id: DbId, device: &DeviceInfo) -> AppResult<()> {
        self.sessions.revoke(session_id, device).await
    }

    /// Revoke every session the user holds.
    pub async fn logout_all(&self, user_id: DbId) -> AppResult<u64> {
        self.sessions.revoke_all(user_id).await
    }

    pub async fn get_profile(&self, user_id: DbId) -> AppResult<UserResponse> {
        Ok(self.find_user(user_id).await?.into())
    }

    // -- User management ----------------------------------------------------

    /// Hash the password under a fresh salt and persist the user.
    ///
    /// A duplicate email surfaces as `Conflict`.
    pub async fn create_user(&self, input: RegisterRequest) -> AppResult<UserResponse> {
        let salt = generate_salt();
        let (password, hash_salt) = (input.password, salt.clone());
        let password_hash = run_blocking(move || derive_password_hash(&password, &hash_salt))
            .await?
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

        let user = self
            .users
            .create(&CreateUser {
                id: Uuid::new_v4(),
                name: input.name,
                email: input.email,
                age: input.age,
                password_hash,
                salt,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user.into())
    }

    pub async fn list_users(&self) -> AppResult<Vec<UserResponse>> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn get_user(&self, id: DbId) -> AppResult<UserResponse> {
        Ok(self.find_user(id).await?.into())
    }

    /// Apply a partial update. When nothing would change the stored row is
    /// returned as-is and `updated_at` is left alone.
    pub async fn update_user(
        &self,
        id: DbId,
        input: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        let current = self.find_user(id).await?;
        let update = UpdateUser::from(input);
        if !update.changes(&current) {
            return Ok(current.into());
        }

        let updated = self
            .users
            .update(id, &update)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?;

        tracing::info!(user_id = %id, "User updated");
        Ok(updated.into())
    }

    /// Delete a user and, through the cascade, all of their sessions.
    pub async fn delete_user(&self, id: DbId) -> AppResult<UserResponse> {
        let deleted = self
            .users
            .delete(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?;

        tracing::info!(user_id = %id, "User deleted");
        Ok(deleted.into())
    }

    async fn find_user(&self, id: DbId) -> AppResult<User> {
        Ok(self
            .users
            .find_by_id(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "User", id })?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::auth::jwt::{JwtConfig, TokenCodec};
    use crate::auth::memory::{MemorySessionStore, MemoryUserStore};

    struct Harness {
        service: AuthService,
        sessions: MemorySessionStore,
    }

    fn harness() -> Harness {
        let sessions = MemorySessionStore::new();
        let users = MemoryUserStore::with_sessions(sessions.clone());
        let codec = TokenCodec::new(&JwtConfig {
            access_secret: "svc-access".to_string(),
            refresh_secret: "svc-refresh".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        });
        let manager = SessionManager::new(Arc::new(sessions.clone()), Arc::new(codec));
        Harness {
            service: AuthService::new(Arc::new(users), Arc::new(manager)),
            sessions,
        }
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Alice".to_string(),
            email: email.to_string(),
            password: "Secret123".to_string(),
            age: 30,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn phone() -> DeviceInfo {
        DeviceInfo::new("phone-1", "okhttp", "10.0.0.1")
    }

    #[tokio::test]
    async fn register_then_login_issues_tokens_for_that_user() {
        let h = harness();
        let user = h.service.register(register_req("a@test.com")).await.unwrap();
        assert_eq!(user.email, "a@test.com");

        let pair = h
            .service
            .login(login_req("a@test.com", "Secret123"), &phone())
            .await
            .unwrap();
        let claims = h
            .service
            .sessions()
            .codec()
            .verify_access_token(&pair.access_token)
            .unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(h.sessions.sessions_for(user.id).len(), 1);
    }

    #[tokio::test]
    async fn register_rejects_single_case_password() {
        let h = harness();
        let mut req = register_req("weak@test.com");
        req.password = "alllowercase".to_string();

        let result = h.service.register(req).await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let h = harness();
        h.service.register(register_req("dup@test.com")).await.unwrap();
        let result = h.service.register(register_req("dup@test.com")).await;
        assert_matches!(result, Err(AppError::Core(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let h = harness();
        h.service.register(register_req("b@test.com")).await.unwrap();
        let result = h
            .service
            .login(login_req("b@test.com", "Wrong123"), &phone())
            .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Unauthorized(msg))) if msg == INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized_not_not_found() {
        let h = harness();
        let result = h
            .service
            .login(login_req("nobody@test.com", "Secret123"), &phone())
            .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Unauthorized(msg))) if msg == INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn profile_of_missing_user_is_not_found() {
        let h = harness();
        let result = h.service.get_profile(Uuid::new_v4()).await;
        assert_matches!(result, Err(AppError::Core(CoreError::NotFound { entity: "User", .. })));
    }

    #[tokio::test]
    async fn logout_revokes_only_the_current_session() {
        let h = harness();
        let user = h.service.register(register_req("c@test.com")).await.unwrap();
        let tablet = DeviceInfo::new("tablet", "safari", "");
        let a = h
            .service
            .login(login_req("c@test.com", "Secret123"), &phone())
            .await
            .unwrap();
        h.service
            .login(login_req("c@test.com", "Secret123"), &tablet)
            .await
            .unwrap();

        let codec = h.service.sessions().codec();
        let session_a = codec.verify_access_token(&a.access_token).unwrap().session_id;
        h.service.logout(session_a, &phone()).await.unwrap();

        let active: Vec<_> = h
            .sessions
            .sessions_for(user.id)
            .into_iter()
            .filter(|s| !s.revoked)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].device_id, "tablet");
    }

    #[tokio::test]
    async fn logout_all_reports_count() {
        let h = harness();
        let user = h.service.register(register_req("d@test.com")).await.unwrap();
        for _ in 0..3 {
            h.service
                .login(login_req("d@test.com", "Secret123"), &phone())
                .await
                .unwrap();
        }
        assert_eq!(h.service.logout_all(user.id).await.unwrap(), 3);
        assert_eq!(h.service.logout_all(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_without_changes_is_a_no_op() {
        let h = harness();
        let user = h.service.register(register_req("e@test.com")).await.unwrap();
        let same = UpdateUserRequest {
            name: Some(user.name.clone()),
            ..Default::default()
        };
        let result = h.service.update_user(user.id, same).await.unwrap();
        assert_eq!(result, user);
    }

    #[tokio::test]
    async fn update_applies_changed_fields() {
        let h = harness();
        let user = h.service.register(register_req("f@test.com")).await.unwrap();
        let change = UpdateUserRequest {
            age: Some(44),
            ..Default::default()
        };
        let updated = h.service.update_user(user.id, change).await.unwrap();
        assert_eq!(updated.age, 44);
        assert_eq!(updated.email, user.email);
    }

    #[tokio::test]
    async fn delete_removes_user_and_sessions() {
        let h = harness();
        let user = h.service.register(register_req("g@test.com")).await.unwrap();
        h.service
            .login(login_req("g@test.com", "Secret123"), &phone())
            .await
            .unwrap();

        let deleted = h.service.delete_user(user.id).await.unwrap();
        assert_eq!(deleted.id, user.id);
        assert!(h.sessions.sessions_for(user.id).is_empty());
        assert_matches!(
            h.service.delete_user(user.id).await,
            Err(AppError::Core(CoreError::NotFound { .. }))
        );
    }

    #[test]
    fn request_validation_rules() {
        let mut req = register_req("not-an-email");
        assert!(req.validate().is_err());

        req.email = "ok@test.com".to_string();
        req.age = 12;
        assert!(req.validate().is_err());

        req.age = 13;
        req.password = "Ab1".to_string();
        assert!(req.validate().is_err());

        req.password = "Abcdef".to_string();
        assert!(req.validate().is_ok());
    }

    /// `local(60) @ domain(len - 65) .com`; always a syntactically valid email.
    fn email_of_len(len: usize) -> String {
        format!("{}@{}.com", "a".repeat(60), "b".repeat(len - 65))
    }

    #[test]
    fn email_longer_than_its_column_is_rejected() {
        assert_eq!(email_of_len(101).len(), 101);

        assert!(register_req(&email_of_len(100)).validate().is_ok());
        assert!(register_req(&email_of_len(101)).validate().is_err());

        let update = UpdateUserRequest {
            email: Some(email_of_len(101)),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let login = LoginRequest {
            email: email_of_len(101),
            password: "Abcdef".to_string(),
        };
        assert!(login.validate().is_err());
    }
}
