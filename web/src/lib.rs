//! HTTP and WebSocket surface for Agora.

use axum_login::{
    tower_sessions::{Expiry, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use domain::events::EventBus;
use domain::user::Backend;
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::Arc;
use time::Duration;
use tower_http::cors::CorsLayer;
use tower_sessions_sqlx_store::PostgresStore;

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
pub mod router;
mod ws;

pub use error::{Error, Result};

/// Application state shared with every controller and the WebSocket
/// handler. The event bus and the realtime manager are constructed once in
/// `main` and injected here; neither is ambient global state.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
    pub event_bus: Arc<EventBus>,
    pub realtime_manager: Arc<realtime::Manager>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: &Arc<DatabaseConnection>,
        event_bus: Arc<EventBus>,
        realtime_manager: Arc<realtime::Manager>,
    ) -> Self {
        Self {
            database_connection: Arc::clone(db),
            config,
            event_bus,
            realtime_manager,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}

/// Builds the session/auth layers and serves the router until a shutdown
/// signal arrives; live connections are then drained through the realtime
/// manager before the process exits.
pub async fn init_server(app_state: AppState) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Sessions are stored next to the data they guard.
    let pool = app_state
        .database_connection
        .get_postgres_connection_pool()
        .clone();
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            app_state.config.backend_session_expiry_seconds as i64,
        )));

    let backend = Backend::new(&app_state.database_connection);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let cors_layer = build_cors_layer(&app_state.config);

    let host = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = app_state.config.port;

    let realtime_manager = app_state.realtime_manager.clone();
    let routes = router::define_routes(app_state)
        .layer(auth_layer)
        .layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    info!("Server starting... listening for connections on http://{host}:{port}");

    axum::serve(listener, routes)
        .with_graceful_shutdown(shutdown_signal(realtime_manager))
        .await?;

    Ok(())
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    use axum::http::{header, HeaderName, HeaderValue, Method};

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_origin(origins)
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-version"),
        ])
}

async fn shutdown_signal(realtime_manager: Arc<realtime::Manager>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    realtime_manager.shutdown();
}
