//! Per-adapter token bucket, replacing the Python original's blocking
//! `time.sleep` between requests (`onchain_api/utils/rate_limiter.py`) with
//! an async-friendly wait so ticks interleave cleanly (spec.md §9 REDESIGN
//! FLAGS: "prefer a per-adapter token bucket").

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One token refills every `interval`, up to `burst` tokens banked.
pub struct TokenBucket {
    interval: Duration,
    burst: u32,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(interval: Duration, burst: u32) -> Self {
        TokenBucket {
            interval,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Blocks (asynchronously) until a token is available, then consumes
    /// one. Bounded by construction: worst case wait is one `interval`.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("lock not poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                let refill_rate = 1.0 / self.interval.as_secs_f64();
                state.tokens = (state.tokens + elapsed * refill_rate).min(self.burst as f64);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64(deficit / refill_rate))
                }
            };

            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_tokens_are_immediately_available() {
        let bucket = TokenBucket::new(Duration::from_millis(100), 3);
        bucket.acquire().await;
        bucket.acquire().await;
        bucket.acquire().await;
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_bucket_waits_for_refill() {
        let bucket = TokenBucket::new(Duration::from_millis(100), 1);
        bucket.acquire().await;
        let start = tokio::time::Instant::now();
        bucket.acquire().await;
        assert!(tokio::time::Instant::now() - start >= Duration::from_millis(90));
    }
}
