//! Per-client admission control.
//!
//! Every client IP gets a [`Visitor`] holding a token bucket. A denial puts
//! the visitor into a hard block for `block_duration`; while blocked every
//! request is refused regardless of the bucket level. Visitors idle for
//! longer than `idle_ttl` are dropped by [`RateLimiter::sweep`].
//!
//! The registry is a single `HashMap` behind one `Mutex`. Lookup, creation,
//! `last_seen` touch and block transitions all happen under that lock, so the
//! bookkeeping for one IP is totally ordered.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::error::{AvatarError, AvatarResult};
use crate::token_bucket::TokenBucket;

/// Tunables for the limiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub burst_size: u32,
    pub requests_per_second: f64,
    #[serde(with = "humantime_serde")]
    pub block_duration: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            burst_size: 35,
            requests_per_second: 15.0,
            block_duration: Duration::from_secs(10),
            idle_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(2 * 60),
        }
    }
}

/// Bookkeeping record for one client IP.
#[derive(Debug, Clone)]
pub struct Visitor {
    bucket: TokenBucket,
    last_seen: Instant,
    blocked_until: Option<Instant>,
}

impl Visitor {
    fn new(settings: &LimiterSettings, now: Instant) -> Self {
        Self {
            bucket: TokenBucket::new(settings.burst_size, settings.requests_per_second, now),
            last_seen: now,
            blocked_until: None,
        }
    }

    fn is_blocked(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    /// The bucket ran dry on this request; the visitor is now blocked.
    Denied,
    /// The visitor was already blocked.
    Blocked { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Converts a refusal into the matching error.
    pub fn into_result(self) -> AvatarResult<u32> {
        match self {
            Decision::Allowed { remaining } => Ok(remaining),
            Decision::Denied => Err(AvatarError::RateLimited),
            Decision::Blocked { retry_after_secs } => Err(AvatarError::Blocked { retry_after_secs }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LimiterStats {
    pub tracked_visitors: usize,
    pub blocked_visitors: usize,
    pub settings: LimiterSettings,
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    settings: Arc<LimiterSettings>,
    visitors: Arc<Mutex<HashMap<String, Visitor>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(settings: LimiterSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: LimiterSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings: Arc::new(settings),
            visitors: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    fn lock_visitors(&self) -> AvatarResult<MutexGuard<'_, HashMap<String, Visitor>>> {
        self.visitors
            .lock()
            .map_err(|_| AvatarError::Internal("Failed to acquire lock on visitor registry".to_string()))
    }

    /// Evaluates one request from `client_ip`.
    pub fn check(&self, client_ip: &str) -> AvatarResult<Decision> {
        let now = self.clock.now();
        let mut visitors = self.lock_visitors()?;

        let visitor = visitors
            .entry(client_ip.to_string())
            .or_insert_with(|| Visitor::new(&self.settings, now));
        visitor.last_seen = now;

        if let Some(until) = visitor.blocked_until.filter(|until| now < *until) {
            let remaining = until.duration_since(now).as_secs_f64().ceil() as u64;
            return Ok(Decision::Blocked {
                retry_after_secs: remaining.max(1),
            });
        }
        visitor.blocked_until = None;

        if visitor.bucket.allow(now) {
            return Ok(Decision::Allowed {
                remaining: visitor.bucket.available_tokens(now),
            });
        }

        visitor.blocked_until = Some(now + self.settings.block_duration);
        tracing::warn!(
            client_ip = %client_ip,
            block_secs = self.settings.block_duration.as_secs(),
            "visitor exceeded burst, blocking"
        );
        Ok(Decision::Denied)
    }

    /// Removes visitors not seen within `idle_ttl`. Returns how many were dropped.
    pub fn sweep(&self) -> AvatarResult<usize> {
        let now = self.clock.now();
        let ttl = self.settings.idle_ttl;
        let mut visitors = self.lock_visitors()?;

        let initial_count = visitors.len();
        visitors.retain(|_, visitor| now.saturating_duration_since(visitor.last_seen) <= ttl);
        Ok(initial_count - visitors.len())
    }

    pub fn visitor_count(&self) -> AvatarResult<usize> {
        Ok(self.lock_visitors()?.len())
    }

    pub fn stats(&self) -> AvatarResult<LimiterStats> {
        let now = self.clock.now();
        let visitors = self.lock_visitors()?;

        Ok(LimiterStats {
            tracked_visitors: visitors.len(),
            blocked_visitors: visitors.values().filter(|v| v.is_blocked(now)).count(),
            settings: (*self.settings).clone(),
        })
    }

    /// Starts the periodic eviction task on the current tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        let limiter = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => match limiter.sweep() {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "evicted idle visitors"),
                        Err(err) => tracing::error!(error = %err, "visitor sweep failed"),
                    },
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            join,
        }
    }
}

/// Handle to a running sweeper task. Dropping it also stops the task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to exit.
    pub async fn shutdown(mut self) -> AvatarResult<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The task may already be gone; that is fine.
            let _ = tx.send(());
        }
        self.join
            .await
            .map_err(|e| AvatarError::Internal(format!("sweeper task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn limiter_with_clock() -> (RateLimiter, MockClock) {
        let clock = MockClock::default();
        let limiter = RateLimiter::with_clock(LimiterSettings::default(), Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_burst_then_denial() {
        let (limiter, _clock) = limiter_with_clock();

        for _ in 0..35 {
            assert!(limiter.check("10.0.0.1").unwrap().is_allowed());
        }
        assert_eq!(limiter.check("10.0.0.1").unwrap(), Decision::Denied);
    }

    #[test]
    fn test_block_counts_down_then_releases() {
        let (limiter, clock) = limiter_with_clock();
        for _ in 0..35 {
            limiter.check("10.0.0.1").unwrap();
        }
        assert_eq!(limiter.check("10.0.0.1").unwrap(), Decision::Denied);

        assert_eq!(
            limiter.check("10.0.0.1").unwrap(),
            Decision::Blocked { retry_after_secs: 10 }
        );
        clock.advance(Duration::from_millis(3_500));
        assert_eq!(
            limiter.check("10.0.0.1").unwrap(),
            Decision::Blocked { retry_after_secs: 7 }
        );
        clock.advance(Duration::from_millis(6_400));
        assert_eq!(
            limiter.check("10.0.0.1").unwrap(),
            Decision::Blocked { retry_after_secs: 1 }
        );

        clock.advance(Duration::from_millis(100));
        assert!(limiter.check("10.0.0.1").unwrap().is_allowed());
    }

    #[test]
    fn test_concurrent_checks_admit_exactly_the_burst() {
        let (limiter, _clock) = limiter_with_clock();

        let decisions: Vec<Decision> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = limiter.clone();
                    scope.spawn(move || {
                        (0..20)
                            .map(|_| limiter.check("10.0.0.1").unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect()
        });

        let allowed = decisions.iter().filter(|d| d.is_allowed()).count();
        let denied = decisions.iter().filter(|d| **d == Decision::Denied).count();
        let blocked = decisions
            .iter()
            .filter(|d| matches!(d, Decision::Blocked { .. }))
            .count();

        assert_eq!(allowed, 35);
        assert_eq!(denied, 1);
        assert_eq!(blocked, 160 - 36);
        assert_eq!(limiter.visitor_count().unwrap(), 1);
    }

    #[test]
    fn test_clients_are_isolated() {
        let (limiter, _clock) = limiter_with_clock();
        for _ in 0..36 {
            limiter.check("10.0.0.1").unwrap();
        }
        assert!(limiter.check("10.0.0.2").unwrap().is_allowed());
    }

    #[test]
    fn test_sweep_evicts_idle_visitors() {
        let (limiter, clock) = limiter_with_clock();
        limiter.check("10.0.0.1").unwrap();
        clock.advance(Duration::from_secs(200));
        limiter.check("10.0.0.2").unwrap();

        clock.advance(Duration::from_secs(101));
        assert_eq!(limiter.sweep().unwrap(), 1);
        assert_eq!(limiter.visitor_count().unwrap(), 1);
    }

    #[test]
    fn test_evicted_visitor_returns_fresh() {
        let (limiter, clock) = limiter_with_clock();
        for _ in 0..30 {
            limiter.check("10.0.0.1").unwrap();
        }
        clock.advance(Duration::from_secs(301));
        assert_eq!(limiter.sweep().unwrap(), 1);

        match limiter.check("10.0.0.1").unwrap() {
            Decision::Allowed { remaining } => assert_eq!(remaining, 34),
            other => panic!("expected fresh visitor, got {:?}", other),
        }
    }

    #[test]
    fn test_stats_report_blocked_visitors() {
        let (limiter, _clock) = limiter_with_clock();
        for _ in 0..36 {
            limiter.check("10.0.0.1").unwrap();
        }
        limiter.check("10.0.0.2").unwrap();

        let stats = limiter.stats().unwrap();
        assert_eq!(stats.tracked_visitors, 2);
        assert_eq!(stats.blocked_visitors, 1);
    }

    #[test]
    fn test_settings_serialize_human_durations() {
        let json = serde_json::to_value(LimiterSettings::default()).unwrap();
        assert_eq!(json["block_duration"], "10s");
        assert_eq!(json["idle_ttl"], "5m");
        assert_eq!(json["sweep_interval"], "2m");
    }

    #[test]
    fn test_decision_into_result() {
        assert_eq!(Decision::Allowed { remaining: 3 }.into_result().unwrap(), 3);
        assert!(matches!(
            Decision::Denied.into_result(),
            Err(AvatarError::RateLimited)
        ));
        assert!(matches!(
            Decision::Blocked { retry_after_secs: 2 }.into_result(),
            Err(AvatarError::Blocked { retry_after_secs: 2 })
        ));
    }

    #[tokio::test]
    async fn test_spawned_sweeper_evicts_and_stops() {
        let (limiter, clock) = limiter_with_clock();
        limiter.check("10.0.0.1").unwrap();
        clock.advance(Duration::from_secs(600));

        let handle = limiter.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.visitor_count().unwrap(), 0);

        handle.shutdown().await.unwrap();
    }
}
