use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::SystemTime;

use crate::glyph::FontCache;
use crate::rate_limiter::RateLimiter;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub tracked_visitors: usize,
    pub font_loaded: bool,
}

static START_TIME: LazyLock<SystemTime> = LazyLock::new(SystemTime::now);

/// Touches the start time so uptime is measured from boot rather than the first probe.
pub fn mark_started() {
    LazyLock::force(&START_TIME);
}

pub fn check_health(limiter: &RateLimiter, fonts: &FontCache) -> HealthStatus {
    let now = SystemTime::now();
    let uptime = now.duration_since(*START_TIME).unwrap_or_default().as_secs();

    // Without a font the service still answers, just without raster text.
    let font_loaded = fonts.has_font();
    let (status, tracked_visitors) = match limiter.visitor_count() {
        Ok(count) if font_loaded => ("healthy", count),
        Ok(count) => ("degraded", count),
        Err(_) => ("unhealthy", 0),
    };

    HealthStatus {
        status: status.to_string(),
        timestamp: now
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        tracked_visitors,
        font_loaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::LimiterSettings;

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy".to_string(),
            timestamp: 1234567890,
            version: "1.0.0".to_string(),
            uptime_seconds: 3600,
            tracked_visitors: 2,
            font_loaded: true,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("1234567890"));
    }

    #[test]
    fn test_bundled_font_reports_healthy() {
        let limiter = RateLimiter::new(LimiterSettings::default());
        let status = check_health(&limiter, &FontCache::bundled());
        assert_eq!(status.status, "healthy");
        assert!(status.font_loaded);
    }

    #[test]
    fn test_missing_font_reports_degraded() {
        let limiter = RateLimiter::new(LimiterSettings::default());
        limiter.check("10.0.0.1").unwrap();

        let status = check_health(&limiter, &FontCache::empty());
        assert_eq!(status.status, "degraded");
        assert_eq!(status.tracked_visitors, 1);
        assert!(!status.font_loaded);
    }
}
