//! Source Health Tracker (C2): per-adapter rolling success/failure counters,
//! EMA response time, and the DOWN cooldown gate. Grounded on
//! `examples/original_source/btc_collector/core/multi_source_provider.py`'s
//! `SourceHealth` dataclass.

use std::time::Duration;

use chrono::{DateTime, Utc};
use onchain_types::{SourceHealth, SourceStatus};
use tokio::sync::RwLock;

/// Cooldown before a DOWN source is tried again (spec.md I6, default 5m).
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Thread-safe wrapper around one adapter's `SourceHealth`. C3 is the only
/// caller that mutates it; `is_available` is read far more often than it's
/// written, hence the `RwLock` (spec.md §5).
pub struct HealthTracker {
    cooldown: Duration,
    state: RwLock<SourceHealth>,
}

impl HealthTracker {
    pub fn new() -> Self {
        HealthTracker::with_cooldown(DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        HealthTracker {
            cooldown,
            state: RwLock::new(SourceHealth::default()),
        }
    }

    pub async fn snapshot(&self) -> SourceHealth {
        self.state.read().await.clone()
    }

    /// `now - last_failure >= cooldown` reopens a DOWN source (I6).
    pub async fn is_available(&self) -> bool {
        let health = self.state.read().await;
        if health.status != SourceStatus::Down {
            return true;
        }
        match health.last_failure {
            Some(last_failure) => {
                let elapsed = Utc::now().signed_duration_since(last_failure);
                elapsed
                    >= chrono::Duration::from_std(self.cooldown).expect("cooldown fits in range")
            }
            None => true,
        }
    }

    pub async fn record_success(&self, response_time_ms: f64) {
        let mut health = self.state.write().await;
        health.last_success = Some(Utc::now());
        health.consecutive_failures = 0;
        health.total_requests += 1;
        health.ema_response_ms = if health.ema_response_ms == 0.0 {
            response_time_ms
        } else {
            0.9 * health.ema_response_ms + 0.1 * response_time_ms
        };
        health.status = SourceStatus::Healthy;
    }

    /// Capability-unsupported failures don't degrade health (spec.md §7):
    /// callers should not call this for those, only for genuine failures.
    pub async fn record_failure(&self) {
        let mut health = self.state.write().await;
        health.last_failure = Some(Utc::now());
        health.consecutive_failures += 1;
        health.total_requests += 1;
        health.total_failures += 1;

        health.status = if health.consecutive_failures >= 5 {
            SourceStatus::Down
        } else if health.consecutive_failures >= 2 {
            SourceStatus::Degraded
        } else {
            health.status
        };
    }

    pub async fn last_failure(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_failure
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        HealthTracker::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn five_consecutive_failures_marks_down() {
        let tracker = HealthTracker::new();
        for _ in 0..4 {
            tracker.record_failure().await;
        }
        assert_eq!(tracker.snapshot().await.status, SourceStatus::Degraded);
        tracker.record_failure().await;
        assert_eq!(tracker.snapshot().await.status, SourceStatus::Down);
    }

    #[tokio::test]
    async fn down_source_is_unavailable_within_cooldown() {
        let tracker = HealthTracker::with_cooldown(Duration::from_secs(300));
        for _ in 0..5 {
            tracker.record_failure().await;
        }
        assert!(!tracker.is_available().await);
    }

    #[tokio::test]
    async fn down_source_becomes_available_after_cooldown_elapses() {
        let tracker = HealthTracker::with_cooldown(Duration::from_millis(1));
        for _ in 0..5 {
            tracker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(tracker.is_available().await);
    }

    #[tokio::test]
    async fn success_after_cooldown_resets_to_healthy() {
        let tracker = HealthTracker::with_cooldown(Duration::from_millis(1));
        for _ in 0..5 {
            tracker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        tracker.record_success(12.0).await;
        let snap = tracker.snapshot().await;
        assert_eq!(snap.status, SourceStatus::Healthy);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn ema_response_time_uses_09_01_blend() {
        let tracker = HealthTracker::new();
        tracker.record_success(100.0).await;
        tracker.record_success(200.0).await;
        let snap = tracker.snapshot().await;
        assert!((snap.ema_response_ms - 110.0).abs() < 1e-9);
    }
}
