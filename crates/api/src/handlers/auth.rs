//! Handlers for the `/auth` resource (register, login, refresh, logout, profile).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use usermgmt_db::models::user::UserResponse;
use validator::Validate;

use crate::auth::service::{LoginRequest, RegisterRequest};
use crate::auth::session::TokenPair;
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthUser;
use crate::middleware::device::Device;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Response payload for `POST /auth/logout-all`.
#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    /// Number of sessions that were active and are now revoked.
    pub revoked: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account. Returns 201 with the new user's profile.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let user = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. The new session is bound to the
/// requesting device.
pub async fn login(
    State(state): State<AppState>,
    Device(device): Device,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let pair = state.auth.login(input, &device).await?;
    Ok(Json(auth_response(&state, pair)))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. Must come from the device the
/// session was issued to.
pub async fn refresh(
    State(state): State<AppState>,
    Device(device): Device,
    ValidatedJson(input): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let claims = state
        .codec()
        .verify_refresh_token(&input.refresh_token)
        .map_err(|e| {
            tracing::warn!(error = %e, "Refresh token failed verification");
            AppError::unauthorized("Invalid or expired refresh token")
        })?;

    let pair = state
        .auth
        .sessions()
        .refresh(&input.refresh_token, &device, claims.session_id)
        .await?;

    Ok(Json(auth_response(&state, pair)))
}

/// POST /api/v1/auth/logout
///
/// Revoke the session the access token belongs to. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Device(device): Device,
) -> AppResult<StatusCode> {
    state.auth.logout(auth_user.session_id, &device).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every session of the authenticated user.
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<LogoutAllResponse>>> {
    let revoked = state.auth.logout_all(auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: LogoutAllResponse { revoked },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.auth.get_profile(auth_user.user_id).await?;
    Ok(Json(DataResponse { data: user }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn auth_response(state: &AppState, pair: TokenPair) -> AuthResponse {
    AuthResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.codec().access_ttl().num_seconds(),
    }
}
