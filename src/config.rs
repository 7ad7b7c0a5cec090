use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::error::{AvatarError, AvatarResult};
use crate::rate_limiter::LimiterSettings;

#[derive(Debug, Clone, Parser, Validate)]
#[command(name = "avatar-server", version, about = "Generated avatar images over HTTP")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Font used for raster text
    #[arg(long, env = "FONT_PATH", default_value = "fonts/DejaVuSans.ttf")]
    pub font_path: PathBuf,

    /// Directory holding index.html
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    #[validate(url)]
    pub github_api_url: String,

    /// Timeout for profile lookups, in seconds
    #[arg(long, env = "GITHUB_TIMEOUT_SECS", default_value_t = 5)]
    #[validate(range(min = 1, max = 60))]
    pub github_timeout_secs: u64,

    /// Steady token refill rate per client
    #[arg(long, env = "RATE_LIMIT_RPS", default_value_t = 15)]
    #[validate(range(min = 1))]
    pub requests_per_second: u32,

    /// Token bucket capacity per client
    #[arg(long, env = "RATE_LIMIT_BURST", default_value_t = 35)]
    #[validate(range(min = 1))]
    pub burst_size: u32,

    /// How long a client stays blocked after exhausting its burst, in seconds
    #[arg(long, env = "RATE_LIMIT_BLOCK_SECS", default_value_t = 10)]
    pub block_duration_secs: u64,

    /// Interval between idle-visitor sweeps, in seconds
    #[arg(long, env = "RATE_LIMIT_CLEANUP_SECS", default_value_t = 120)]
    #[validate(range(min = 1))]
    pub cleanup_interval_secs: u64,

    /// Idle time after which a visitor is forgotten, in seconds
    #[arg(long, env = "RATE_LIMIT_TTL_SECS", default_value_t = 300)]
    #[validate(range(min = 1))]
    pub visitor_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            log_level: "info".to_string(),
            font_path: PathBuf::from("fonts/DejaVuSans.ttf"),
            static_dir: PathBuf::from("static"),
            github_api_url: "https://api.github.com".to_string(),
            github_timeout_secs: 5,
            requests_per_second: 15,
            burst_size: 35,
            block_duration_secs: 10,
            cleanup_interval_secs: 120,
            visitor_ttl_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from command line and environment variables.
    /// Exits the process on `--help`, `--version` or unparsable arguments.
    pub fn load() -> AvatarResult<Self> {
        let config = Config::parse();
        config.validate_all()?;
        Ok(config)
    }

    pub fn validate_all(&self) -> AvatarResult<()> {
        self.validate()
            .map_err(|e| AvatarError::Configuration(e.to_string()))
    }

    pub fn github_timeout(&self) -> Duration {
        Duration::from_secs(self.github_timeout_secs)
    }

    pub fn index_path(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }

    pub fn limiter_settings(&self) -> LimiterSettings {
        LimiterSettings {
            burst_size: self.burst_size,
            requests_per_second: self.requests_per_second as f64,
            block_duration: Duration::from_secs(self.block_duration_secs),
            idle_ttl: Duration::from_secs(self.visitor_ttl_secs),
            sweep_interval: Duration::from_secs(self.cleanup_interval_secs),
        }
    }
}
