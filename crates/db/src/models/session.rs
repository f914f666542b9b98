//! User session model.

use sqlx::FromRow;
use usermgmt_core::device::DeviceInfo;
use usermgmt_core::types::{DbId, Timestamp};

/// A row from the `user_sessions` table.
///
/// `hashed_refresh_token` is an Argon2 PHC string; the raw refresh token is
/// never persisted.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub hashed_refresh_token: String,
    pub device_id: String,
    pub device_ua: String,
    pub device_ip: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked: bool,
}

impl UserSession {
    /// Whether `now` is past the fixed expiry.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Whether the presented device is the one this session was issued to.
    pub fn is_bound_to(&self, device: &DeviceInfo) -> bool {
        device.matches(&self.device_id, &self.device_ua)
    }
}
