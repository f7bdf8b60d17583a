// src/generate/rate_limit.rs
//! Fixed-window limiter for outbound generation calls.
//!
//! At most `max_per_window` permits are handed out per window. The window restarts once a
//! full window has elapsed since its start; a caller that finds the window exhausted sleeps
//! until the boundary and opens the next window itself. Bursts of up to twice the limit
//! can straddle a boundary.

use std::time::Duration;

use metrics::counter;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_MAX_PER_SECOND: u32 = 5;

#[derive(Debug)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    // Held across the enforced sleep, so waiting callers queue in arrival order.
    state: Mutex<WindowState>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window: max_per_window.max(1),
            window,
            state: Mutex::new(WindowState {
                count: 0,
                window_start: Instant::now(),
            }),
        }
    }

    pub fn per_second(max: u32) -> Self {
        Self::new(max, Duration::from_secs(1))
    }

    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }

    /// Wait (if needed) until the caller may issue one call.
    pub async fn acquire(&self) {
        let mut st = self.state.lock().await;
        let now = Instant::now();

        if now.duration_since(st.window_start) >= self.window {
            st.count = 0;
            st.window_start = now;
        }

        if st.count >= self.max_per_window {
            let wait = self.window.saturating_sub(now.duration_since(st.window_start));
            tracing::info!(target: "rate_limit", wait_ms = wait.as_millis() as u64, "rate limit hit");
            counter!("haiku_rate_limit_waits_total").increment(1);
            tokio::time::sleep(wait).await;
            st.count = 1;
            st.window_start = Instant::now();
        } else {
            st.count += 1;
        }
    }

    /// Run `f` once a permit is available.
    pub async fn run<F, T>(&self, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.acquire().await;
        f.await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second(DEFAULT_MAX_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_k_calls_pass_immediately() {
        let rl = RateLimiter::per_second(5);
        let t0 = Instant::now();
        for _ in 0..5 {
            rl.acquire().await;
        }
        assert_eq!(Instant::now(), t0);
    }

    #[tokio::test(start_paused = true)]
    async fn k_plus_one_waits_for_next_window() {
        let rl = RateLimiter::per_second(5);
        let t0 = Instant::now();
        for _ in 0..6 {
            rl.acquire().await;
        }
        assert!(Instant::now().duration_since(t0) >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_idle_period() {
        let rl = RateLimiter::per_second(2);
        rl.acquire().await;
        rl.acquire().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let t1 = Instant::now();
        rl.acquire().await;
        rl.acquire().await;
        assert_eq!(Instant::now(), t1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_limit_per_window() {
        for k in [1u32, 3, 5] {
            let rl = Arc::new(RateLimiter::per_second(k));
            let t0 = Instant::now();
            let mut handles = Vec::new();
            for _ in 0..(3 * k + 1) {
                let rl = rl.clone();
                handles.push(tokio::spawn(async move {
                    rl.acquire().await;
                    Instant::now().duration_since(t0)
                }));
            }
            let mut starts = Vec::new();
            for h in handles {
                starts.push(h.await.unwrap());
            }
            starts.sort();
            // Any k+1 consecutive permits must span at least one full window.
            for w in starts.windows(k as usize + 1) {
                assert!(
                    w[k as usize] - w[0] >= Duration::from_millis(1000),
                    "k={k}: {:?}",
                    w
                );
            }
        }
    }
}
