//! Authentication: credentials, tokens, sessions, and the flows built on them.
//!
//! - [`password`] -- Argon2id password derivation and verification.
//! - [`jwt`] -- Token codec for access/refresh JWTs and refresh-token hashing.
//! - [`store`] -- Session and user persistence traits with PostgreSQL impls.
//! - `memory` -- In-process store implementations (test builds only).
//! - [`session`] -- Session lifecycle: issue, rotate, revoke.
//! - [`service`] -- Register, login, logout, profile, and user management.

pub mod jwt;
#[cfg(test)]
pub mod memory;
pub mod password;
pub mod service;
pub mod session;
pub mod store;

use crate::error::{AppError, AppResult};

/// Run CPU-bound work (Argon2) on the blocking pool so it does not stall the
/// async workers.
pub(crate) async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task failed: {e}")))
}
