//! Handlers for the `/users` resource.
//!
//! All routes require a valid access token.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use usermgmt_core::types::DbId;
use usermgmt_db::models::user::UserResponse;

use crate::auth::service::{RegisterRequest, UpdateUserRequest};
use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = state.auth.list_users().await?;
    Ok(Json(DataResponse { data: users }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let user = state.auth.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.auth.get_user(id).await?;
    Ok(Json(DataResponse { data: user }))
}

/// PUT /api/v1/users/{id}
///
/// Partial update; omitted fields keep their current value.
pub async fn update_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
    ValidatedJson(input): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state.auth.update_user(id, input).await?;
    Ok(Json(DataResponse { data: user }))
}

/// DELETE /api/v1/users/{id}
///
/// Deletes the user and all of their sessions. Returns the deleted profile.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    tracing::debug!(requested_by = %auth.user_id, user_id = %id, "Deleting user");
    let user = state.auth.delete_user(id).await?;
    Ok(Json(DataResponse { data: user }))
}
