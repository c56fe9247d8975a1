pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod session;

use std::sync::Arc;
use std::time::Duration;
use sqlx::PgPool;
use actix_web::HttpResponse;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{AuthService, Principal, SessionConfig, UserDirectory};
pub use db::UserStore;
pub use session::{MemorySessionStore, PgSessionStore, SessionStore};

use crate::config::SessionBackend;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth_service: Arc<AuthService>,
    pub session_store: Arc<dyn SessionStore>,
    pub db_pool: Option<Arc<PgPool>>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        // Initialize database connection pool
        let db_pool = Arc::new(
            UserStore::connect(
                &config.database.url,
                config.database.max_connections,
                Duration::from_secs(config.database.acquire_timeout_secs),
            )
            .await?,
        );

        sqlx::migrate!("./migrations").run(db_pool.as_ref()).await?;

        let session_store: Arc<dyn SessionStore> = match config.session_store.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
            SessionBackend::Postgres => Arc::new(PgSessionStore::new(db_pool.clone())),
        };
        info!("Using {:?} session store", config.session_store.backend);

        let directory = Arc::new(UserStore::new(db_pool.clone()));
        let mut state = Self::with_services(config, session_store, directory)?;
        state.db_pool = Some(db_pool);
        Ok(state)
    }

    /// Builds the state around an existing session store and user directory.
    pub fn with_services(
        config: Settings,
        session_store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let session_config = config.auth.session_config()?;
        let auth_service = AuthService::new(session_config, session_store.clone(), directory);

        Ok(Self {
            config: Arc::new(config),
            auth_service: Arc::new(auth_service),
            session_store,
            db_pool: None,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        // Close database connections
        if let Some(pool) = &self.db_pool {
            pool.close().await;
        }
        Ok(())
    }
}
