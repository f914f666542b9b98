//! Repository for the `user_sessions` table.

use sqlx::PgPool;
use usermgmt_core::types::DbId;

use crate::models::session::UserSession;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, hashed_refresh_token, device_id, device_ua, device_ip, \
                        issued_at, expires_at, revoked";

/// Insert, lookup, and revocation for user sessions.
///
/// There is deliberately no update of any column other than `revoked` and no
/// delete; rows disappear only through the `users` cascade.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a fully-formed session row.
    pub async fn insert(pool: &PgPool, session: &UserSession) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_sessions
                (id, user_id, hashed_refresh_token, device_id, device_ua, device_ip,
                 issued_at, expires_at, revoked)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.hashed_refresh_token)
        .bind(&session.device_id)
        .bind(&session.device_ua)
        .bind(&session.device_ip)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a session by id regardless of its revocation or expiry state.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE id = $1");
        sqlx::query_as::<_, UserSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Revoke a single session. Returns `true` if the row transitioned from
    /// active to revoked.
    pub async fn mark_revoked(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked = true WHERE id = $1 AND revoked = false",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke all active sessions for a user. Returns the count of revoked sessions.
    pub async fn mark_all_revoked_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked = true
             WHERE user_id = $1 AND revoked = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
