pub mod auth;
pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                   register (public)
/// /auth/login                      login (public)
/// /auth/refresh                    refresh (public, device-bound)
/// /auth/logout                     revoke current session (requires auth)
/// /auth/logout-all                 revoke all sessions (requires auth)
/// /auth/me                         current profile (requires auth)
///
/// /users                           list, create (requires auth)
/// /users/{id}                      get, update, delete (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
}
