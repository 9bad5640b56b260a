//! Application startup and lifecycle management.
//!
//! The push provider is constructed exactly once here, before the
//! listener accepts traffic, and handed to the dispatcher through shared
//! state. Request handlers never initialize anything.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers::{health_check, send_push};
use crate::services::{FcmProvider, MockPushProvider, PushProvider, ServiceAccountKey};
use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub push_provider: Arc<dyn PushProvider>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// Selects the real FCM provider when enabled, otherwise a mock that
    /// logs and succeeds.
    pub async fn build(config: AppConfig) -> Result<Self, AppError> {
        let push_provider: Arc<dyn PushProvider> = if config.fcm.enabled {
            let credentials =
                ServiceAccountKey::from_file(Path::new(&config.fcm.credentials_path))?;
            tracing::info!("FCM push provider initialized");
            Arc::new(FcmProvider::new(config.fcm.clone(), credentials))
        } else {
            tracing::info!("FCM provider disabled, using mock push provider");
            Arc::new(MockPushProvider::new(true))
        };

        Self::build_with_provider(config, push_provider).await
    }

    /// Build the application around an already-constructed provider.
    pub async fn build_with_provider(
        config: AppConfig,
        push_provider: Arc<dyn PushProvider>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "push-relay listening");

        Ok(Self {
            port,
            listener,
            state: AppState { push_provider },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/api/send", post(send_push))
            .route("/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Self::router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

    tracing::info!("Shutdown signal received");
}
