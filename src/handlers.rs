use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::Uri,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AvatarError, AvatarResult};
use crate::github::{GithubResolver, ProfileResolver};
use crate::glyph::FontCache;
use crate::health::{check_health, HealthStatus};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::palette::BackgroundMode;
use crate::rate_limiter::{LimiterStats, RateLimiter};
use crate::render::{AvatarRequest, OutputFormat, Renderer, TextMode};
use crate::response::AvatarResponse;
use crate::validation::RequestValidator;

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Application state containing renderer, rate limiter and profile lookup
pub struct AppState {
    pub renderer: Renderer,
    pub limiter: RateLimiter,
    pub profiles: Arc<dyn ProfileResolver>,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(renderer: Renderer, limiter: RateLimiter, profiles: Arc<dyn ProfileResolver>) -> Self {
        Self {
            renderer,
            limiter,
            profiles,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn from_config(config: &Config) -> AvatarResult<Self> {
        let fonts = FontCache::load(&config.font_path);
        let profiles = GithubResolver::new(config.github_api_url.clone(), config.github_timeout())
            .map_err(|e| AvatarError::Configuration(e.to_string()))?;

        Ok(Self::new(
            Renderer::new(Arc::new(fonts)),
            RateLimiter::new(config.limiter_settings()),
            Arc::new(profiles),
        ))
    }
}

/// Query options shared by both avatar routes.
#[derive(Debug, Default, Deserialize)]
pub struct AvatarQuery {
    #[serde(rename = "type")]
    pub format: Option<String>,
    pub initials: Option<String>,
    #[serde(rename = "iName")]
    pub initials_name: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "aType")]
    pub background: Option<String>,
    pub w: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AvatarQuery {
    pub fn into_request(self, identifier: String) -> AvatarResult<AvatarRequest> {
        let canvas_size = RequestValidator::parse_width(self.w.as_deref())?;

        let format = match self.format.as_deref() {
            Some("svg") => OutputFormat::Vector,
            _ => OutputFormat::Raster,
        };
        let background = match self.background.as_deref() {
            Some("color") => BackgroundMode::Solid,
            _ => BackgroundMode::Gradient,
        };
        let text = match non_empty(self.initials) {
            None => TextMode::None,
            Some(value) if value == "auto" => TextMode::AutoInitials {
                seed: non_empty(self.initials_name),
            },
            Some(value) => TextMode::Literal(value),
        };

        Ok(AvatarRequest {
            identifier,
            format,
            canvas_size,
            background,
            explicit_color: non_empty(self.color),
            text,
            corner_radius: 0,
        })
    }
}

async fn render(state: &SharedState, request: AvatarRequest) -> AvatarResult<AvatarResponse> {
    let renderer = state.renderer.clone();
    let format = request.format;

    let avatar = tokio::task::spawn_blocking(move || renderer.render(&request))
        .await
        .map_err(|e| AvatarError::Internal(format!("render task failed: {}", e)))??;

    state.metrics.record_render(format);
    Ok(AvatarResponse(avatar))
}

/// Avatar for a literal identifier
pub async fn avatar(
    State(state): State<SharedState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AvatarQuery>, QueryRejection>,
) -> AvatarResult<AvatarResponse> {
    let Path(identifier) = path.map_err(|e| AvatarError::InvalidRequest(e.body_text()))?;
    RequestValidator::validate_identifier(&identifier)?;
    let Query(query) = query.map_err(|e| AvatarError::InvalidRequest(e.body_text()))?;

    let request = query.into_request(identifier)?;
    render(&state, request).await
}

/// Avatar for a GitHub user, seeded by their display name
pub async fn github_avatar(
    State(state): State<SharedState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<AvatarQuery>, QueryRejection>,
) -> AvatarResult<AvatarResponse> {
    let Path(username) = path.map_err(|e| AvatarError::InvalidRequest(e.body_text()))?;
    RequestValidator::validate_github_username(&username)?;
    let Query(query) = query.map_err(|e| AvatarError::InvalidRequest(e.body_text()))?;

    // Validate the options before spending an upstream call.
    let mut request = query.into_request(username.clone())?;

    request.identifier = state.profiles.resolve(&username).await.map_err(|e| {
        state.metrics.record_upstream_failure();
        tracing::warn!(username = %username, error = %e, "profile lookup failed");
        AvatarError::from(e)
    })?;

    render(&state, request).await
}

/// Health check endpoint
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthStatus> {
    Json(check_health(&state.limiter, state.renderer.fonts()))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub limiter: LimiterStats,
    pub metrics: MetricsSnapshot,
}

/// Rate limiter and request counters
pub async fn stats(State(state): State<SharedState>) -> AvatarResult<Json<StatsResponse>> {
    Ok(Json(StatsResponse {
        limiter: state.limiter.stats()?,
        metrics: state.metrics.snapshot(),
    }))
}

/// Fallback for unmatched paths
pub async fn not_found(uri: Uri) -> AvatarError {
    AvatarError::NotFound(format!("Not found: {}", uri.path()))
}
