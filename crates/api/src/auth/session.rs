//! Session lifecycle: issue token pairs, rotate them on refresh, revoke them.
//!
//! ```text
//! ACTIVE --refresh (rotate)--> REVOKED
//! ACTIVE --logout----------> REVOKED
//! ACTIVE --expires_at passes--> EXPIRED   (observed lazily on refresh)
//! ```
//!
//! Nothing leaves `REVOKED`. Rotation revokes the old row first and only then
//! issues the replacement; if issuance fails the user is logged out rather
//! than left holding a replayable token. The two steps are not wrapped in a
//! transaction.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use usermgmt_core::device::DeviceInfo;
use usermgmt_core::error::CoreError;
use usermgmt_core::types::DbId;
use usermgmt_db::models::session::UserSession;
use uuid::Uuid;

use super::jwt::{hash_opaque_token, verify_opaque_token_hash, TokenCodec};
use super::run_blocking;
use super::store::SessionStore;
use crate::error::{AppError, AppResult};

/// Single message for every refresh rejection so clients cannot tell which
/// check failed. The specific reason is logged.
const REFRESH_REJECTED: &str = "Invalid or expired refresh token";

/// Credentials returned by login and refresh. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues, rotates, and revokes sessions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: Arc<TokenCodec>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create a new session bound to `device` and return its token pair.
    ///
    /// Device attributes are stored verbatim.
    pub async fn issue_token_pair(
        &self,
        user_id: DbId,
        device: &DeviceInfo,
    ) -> AppResult<TokenPair> {
        if !device.is_bindable() {
            return Err(AppError::BadRequest(
                "Device id and user agent are required".into(),
            ));
        }

        let session_id = Uuid::new_v4();

        let access_token = self
            .codec
            .issue_access_token(user_id, session_id)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
        let (refresh_token, issued_at, expires_at) = self
            .codec
            .issue_refresh_token(user_id, session_id)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

        let raw = refresh_token.clone();
        let hashed_refresh_token = run_blocking(move || hash_opaque_token(&raw))
            .await?
            .map_err(|e| AppError::InternalError(format!("Refresh token hashing error: {e}")))?;

        let session = UserSession {
            id: session_id,
            user_id,
            hashed_refresh_token,
            device_id: device.id.clone(),
            device_ua: device.user_agent.clone(),
            device_ip: device.ip.clone(),
            issued_at,
            expires_at,
            revoked: false,
        };
        self.store
            .insert(&session)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to save session: {e}")))?;

        tracing::info!(
            %user_id,
            %session_id,
            device_id = %device.id,
            "Session issued",
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair under a new session.
    ///
    /// The old session is revoked before the new one is issued.
    pub async fn refresh(
        &self,
        presented_token: &str,
        device: &DeviceInfo,
        claimed_session_id: DbId,
    ) -> AppResult<TokenPair> {
        let session = self
            .store
            .find_by_id(claimed_session_id)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to load session: {e}")))?
            .ok_or_else(|| reject(claimed_session_id, "session not found"))?;

        if session.revoked {
            return Err(reject(session.id, "session already revoked"));
        }
        if session.is_expired_at(Utc::now()) {
            return Err(reject(session.id, "session expired"));
        }

        let raw = presented_token.to_string();
        let stored = session.hashed_refresh_token.clone();
        match run_blocking(move || verify_opaque_token_hash(&raw, &stored)).await? {
            Ok(true) => {}
            Ok(false) => return Err(reject(session.id, "refresh token hash mismatch")),
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Stored refresh hash unreadable");
                return Err(reject(session.id, "refresh token hash unverifiable"));
            }
        }

        if !session.is_bound_to(device) {
            return Err(reject(session.id, "device mismatch"));
        }

        let transitioned = self
            .store
            .mark_revoked(session.id)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to revoke session: {e}")))?;
        if !transitioned {
            // Another request rotated this session between the load and here.
            return Err(reject(session.id, "session revoked concurrently"));
        }

        tracing::info!(user_id = %session.user_id, session_id = %session.id, "Session rotated");

        self.issue_token_pair(session.user_id, device).await
    }

    /// Revoke one session on behalf of an already-authenticated caller.
    ///
    /// Revoking a missing session is `NotFound`; revoking an already-revoked
    /// one is `Unauthorized`. Neither is a silent no-op.
    pub async fn revoke(&self, session_id: DbId, device: &DeviceInfo) -> AppResult<()> {
        let session = self
            .store
            .find_by_id(session_id)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to load session: {e}")))?
            .ok_or(CoreError::NotFound {
                entity: "Session",
                id: session_id,
            })?;

        if session.revoked {
            return Err(AppError::unauthorized("Session has already been revoked"));
        }
        if !session.is_bound_to(device) {
            tracing::warn!(%session_id, "Logout rejected: device mismatch");
            return Err(AppError::unauthorized("Device info mismatch"));
        }

        let transitioned = self
            .store
            .mark_revoked(session_id)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to revoke session: {e}")))?;
        if !transitioned {
            return Err(CoreError::NotFound {
                entity: "Session",
                id: session_id,
            }
            .into());
        }

        tracing::info!(user_id = %session.user_id, %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every active session for `user_id`. Returns how many were revoked.
    pub async fn revoke_all(&self, user_id: DbId) -> AppResult<u64> {
        let count = self
            .store
            .mark_all_revoked_for_user(user_id)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to revoke sessions: {e}")))?;

        tracing::info!(%user_id, revoked = count, "All sessions revoked");
        Ok(count)
    }
}

fn reject(session_id: DbId, reason: &'static str) -> AppError {
    tracing::warn!(%session_id, reason, "Refresh rejected");
    AppError::unauthorized(REFRESH_REJECTED)
}
