use axum::http::{header, Method};
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{AvatarError, AvatarResult};
use crate::handlers::{avatar, github_avatar, health_check, not_found, stats, AppState, SharedState};
use crate::middleware::{logging_middleware, rate_limit_middleware};

/// Builds the router. Rate limiting covers the avatar routes only.
pub fn create_app(state: SharedState, index_path: &Path) -> Router {
    let avatars = Router::new()
        .route("/avatar/github/:username", get(github_avatar))
        .route("/avatar/:identifier", get(avatar))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route_service("/", ServeFile::new(index_path))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .merge(avatars)
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(logging_middleware)),
        )
}

pub struct Server {
    config: Config,
    state: SharedState,
}

impl Server {
    pub fn new(config: Config) -> AvatarResult<Self> {
        config.validate_all()?;
        let state = Arc::new(AppState::from_config(&config)?);
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub async fn run(self) -> AvatarResult<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| AvatarError::Internal(format!("failed to bind {}: {}", self.config.bind_addr, e)))?;

        let sweep_interval = self.state.limiter.settings().sweep_interval;
        let sweeper = self.state.limiter.spawn_sweeper(sweep_interval);

        let app = create_app(self.state.clone(), &self.config.index_path());

        tracing::info!("Avatar server listening on {}", self.config.bind_addr);
        tracing::info!("Health check available at /health");

        let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AvatarError::Internal(format!("server error: {}", e)));

        sweeper.shutdown().await?;
        tracing::info!("Avatar server stopped");
        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
