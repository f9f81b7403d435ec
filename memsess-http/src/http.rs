use axum::{
    routing::{get, post},
    Router,
};
use memsess_core::{SessionManager, SessionManagerConfig, UuidGenerator};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::apis;
use crate::binding::SessionBinder;

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address (e.g., "127.0.0.1:8080")
    pub address: String,
    /// Session manager configuration
    pub session_manager: SessionManagerConfig,
}

impl ServerConfig {
    /// Create a new server config with the given address and default session manager config
    pub fn new(address: String) -> Self {
        Self {
            address,
            session_manager: SessionManagerConfig::default(),
        }
    }

    pub fn with_session_manager(mut self, session_manager: SessionManagerConfig) -> Self {
        self.session_manager = session_manager;
        self
    }
}

/// Server state holding the session binder
#[derive(Clone)]
pub struct ServerState {
    pub binder: Arc<SessionBinder>,
}

impl ServerState {
    pub fn new(binder: SessionBinder) -> Self {
        Self {
            binder: Arc::new(binder),
        }
    }

    pub fn session_manager(&self) -> &Arc<SessionManager> {
        self.binder.manager()
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(apis::session::handle_health))
        .route("/v1/session", get(apis::session::handle_get_session))
        .route(
            "/v1/session/attributes/{key}",
            get(apis::session::handle_get_attribute)
                .put(apis::session::handle_put_attribute)
                .delete(apis::session::handle_delete_attribute),
        )
        .route("/v1/login", post(apis::session::handle_login))
        .route("/v1/logout", post(apis::session::handle_logout))
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and the session sweep, until Ctrl+C
pub async fn start_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let session_manager = Arc::new(SessionManager::new(config.session_manager.clone()));
    session_manager.start().await;

    println!("✓ Session manager initialized");
    println!("  Cookie name: \x1b[1m{}\x1b[0m", config.session_manager.cookie_name);
    println!("  Session TTL: \x1b[1m{}s\x1b[0m", config.session_manager.ttl.as_secs());
    println!("  Sweep interval: \x1b[1m{:?}\x1b[0m", config.session_manager.sweep_interval);
    println!();

    let binder = SessionBinder::new(session_manager.clone(), Arc::new(UuidGenerator));
    let app = router(ServerState::new(binder));

    let listener = tokio::net::TcpListener::bind(&config.address).await?;

    // Print server info
    println!("Server starting on \x1b[1mhttp://{}\x1b[0m", config.address);
    println!("\nAvailable endpoints:");
    println!("  \x1b[1mGET    /health\x1b[0m                         - Liveness and session count");
    println!("  \x1b[1mGET    /v1/session\x1b[0m                     - Bind (or create) the current session");
    println!("  \x1b[1mGET    /v1/session/attributes/:key\x1b[0m     - Read a session attribute");
    println!("  \x1b[1mPUT    /v1/session/attributes/:key\x1b[0m     - Write a session attribute");
    println!("  \x1b[1mDELETE /v1/session/attributes/:key\x1b[0m     - Remove a session attribute");
    println!("  \x1b[1mPOST   /v1/login\x1b[0m                       - Record the session user");
    println!("  \x1b[1mPOST   /v1/logout\x1b[0m                      - Destroy the current session");
    println!("\nPress Ctrl+C to stop\n");

    info!("HTTP server listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        })
        .await?;

    session_manager.stop().await;
    Ok(())
}
