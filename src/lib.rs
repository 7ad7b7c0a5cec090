pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod glyph;
pub mod handlers;
pub mod hasher;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod palette;
pub mod rate_limiter;
pub mod render;
pub mod response;
pub mod server;
pub mod token_bucket;
pub mod validation;

pub use config::Config;
pub use error::{AvatarError, AvatarResult};
pub use handlers::{AppState, SharedState};
pub use rate_limiter::{Decision, LimiterSettings, RateLimiter};
pub use render::{AvatarRequest, OutputFormat, Renderer, TextMode};
pub use server::create_app;
