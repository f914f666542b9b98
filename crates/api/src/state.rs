use std::sync::Arc;

use crate::auth::jwt::TokenCodec;
use crate::auth::service::AuthService;
use crate::auth::session::SessionManager;
use crate::auth::store::{PgSessionStore, PgUserStore};
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: usermgmt_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Auth flows, user management, and (through it) the session manager.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wire the PostgreSQL stores, the token codec, and the services.
    ///
    /// The codec is built here, once; its keys are read-only afterwards.
    pub fn new(pool: usermgmt_db::DbPool, config: ServerConfig) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt));
        let sessions = Arc::new(SessionManager::new(
            Arc::new(PgSessionStore::new(pool.clone())),
            codec,
        ));
        let auth = Arc::new(AuthService::new(
            Arc::new(PgUserStore::new(pool.clone())),
            sessions,
        ));

        Self {
            pool,
            config: Arc::new(config),
            auth,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        self.auth.sessions().codec()
    }
}
