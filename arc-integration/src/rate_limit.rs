use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};

/// Priority levels for rate limited operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    High,
    Normal,
    Low,
}

struct Waiter {
    tx: oneshot::Sender<()>,
}

struct Inner {
    capacity: usize,
    tokens: usize,
    interval: Duration,
    last_refill: Instant,
    min_delay: Duration,
    last_acquired: Option<Instant>,
    base_interval: Duration,
    max_interval: Duration,
    high: VecDeque<Waiter>,
    normal: VecDeque<Waiter>,
    low: VecDeque<Waiter>,
}

impl Inner {
    fn refill(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_refill) >= self.interval {
            let periods = now.duration_since(self.last_refill).as_millis() / self.interval.as_millis().max(1);
            let add_tokens = (periods as usize + 1) * self.capacity;
            self.last_refill = now;
            self.tokens = usize::min(self.tokens + add_tokens, self.capacity);
            while self.tokens > 0 {
                if let Some(waiter) = self
                    .high
                    .pop_front()
                    .or_else(|| self.normal.pop_front())
                    .or_else(|| self.low.pop_front())
                {
                    self.tokens -= 1;
                    let _ = waiter.tx.send(());
                } else {
                    break;
                }
            }
        }
    }
}

/// Token-bucket rate limiter with priority queues, a minimum inter-request delay, and
/// adaptive backoff on reported violations. `capacity` == `burst_capacity`, `interval`
/// is chosen so that `capacity` tokens refill every `1 / requests_per_second` seconds,
/// and `min_delay` enforces the minimum spacing between *successive* acquisitions
/// regardless of burst headroom (e.g. burst 2 @ 0.5 rps still spaces requests 3-5 two
/// seconds apart).
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    /// Construct a [`RateLimiter`] allowing `capacity` operations every
    /// `interval`, with no additional minimum spacing between acquisitions.
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self::with_min_delay(capacity, interval, Duration::ZERO)
    }

    /// Construct a [`RateLimiter`] that additionally enforces `min_delay`
    /// between any two successive acquisitions, independent of bucket state.
    pub fn with_min_delay(capacity: usize, interval: Duration, min_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                tokens: capacity,
                interval,
                last_refill: Instant::now(),
                min_delay,
                last_acquired: None,
                base_interval: interval,
                max_interval: interval * 16,
                high: VecDeque::new(),
                normal: VecDeque::new(),
                low: VecDeque::new(),
            })),
        }
    }

    /// Construct a [`RateLimiter`] from a requests-per-second + burst pair, the shape
    /// endpoint tables are configured in.
    pub fn from_rps(requests_per_second: f64, burst_capacity: usize) -> Self {
        let interval = Duration::from_secs_f64(1.0 / requests_per_second.max(f64::MIN_POSITIVE));
        Self::new(burst_capacity, interval)
    }

    /// Acquire a permit according to the provided priority, honouring both
    /// the token bucket and the configured minimum inter-request delay.
    pub async fn acquire(&self, priority: Priority) {
        loop {
            let (rx, wait_for_spacing) = {
                let mut inner = self.inner.lock().await;
                inner.refill();

                let spacing_wait = inner.min_delay.checked_sub(
                    inner
                        .last_acquired
                        .map(|t| t.elapsed())
                        .unwrap_or(inner.min_delay),
                );

                if inner.tokens > 0 && spacing_wait.is_none() {
                    inner.tokens -= 1;
                    inner.last_acquired = Some(Instant::now());
                    (None, None)
                } else if spacing_wait.is_some() {
                    (None, spacing_wait)
                } else {
                    let (tx, rx) = oneshot::channel();
                    let waiter = Waiter { tx };
                    match priority {
                        Priority::High => inner.high.push_back(waiter),
                        Priority::Normal => inner.normal.push_back(waiter),
                        Priority::Low => inner.low.push_back(waiter),
                    }
                    (Some(rx), None)
                }
            };

            match (rx, wait_for_spacing) {
                (None, None) => return,
                (None, Some(delay)) => tokio::time::sleep(delay).await,
                (Some(rx), _) => {
                    let _ = rx.await;
                }
            }
        }
    }

    /// Report a rate limit violation (eg/ HTTP 429) to trigger backoff.
    pub async fn report_violation(&self) {
        let mut inner = self.inner.lock().await;
        let next = inner.interval * 2;
        inner.interval = std::cmp::min(next, inner.max_interval);
    }

    /// Reset the current backoff to the base interval.
    pub async fn reset_backoff(&self) {
        let mut inner = self.inner.lock().await;
        inner.interval = inner.base_interval;
    }
}

/// Configuration for one REST endpoint's rate limit: maps an endpoint prefix to its
/// requests-per-second, burst capacity, and relative weight.
#[derive(Debug, Clone, Copy)]
pub struct EndpointLimit {
    pub requests_per_second: f64,
    pub burst_capacity: usize,
    pub weight: u32,
}

/// Table of per-endpoint [`RateLimiter`]s plus a global limiter enforcing a minimum
/// inter-request delay across all endpoints.
pub struct EndpointRateLimitTable {
    global: RateLimiter,
    per_endpoint: HashMap<&'static str, RateLimiter>,
}

impl EndpointRateLimitTable {
    /// `global_min_delay` is the cross-endpoint minimum spacing (eg/ the 300ms in );
    /// `limits` configures individual endpoint prefixes.
    pub fn new(global_min_delay: Duration, limits: &[(&'static str, EndpointLimit)]) -> Self {
        Self {
            global: RateLimiter::with_min_delay(usize::MAX, Duration::from_millis(1), global_min_delay),
            per_endpoint: limits
                .iter()
                .map(|(prefix, limit)| {
                    (
                        *prefix,
                        RateLimiter::from_rps(limit.requests_per_second, limit.burst_capacity),
                    )
                })
                .collect(),
        }
    }

    /// Acquire both the endpoint-specific and global permits required before issuing a
    /// request to `endpoint`.
    pub async fn acquire(&self, endpoint: &str, priority: Priority) {
        if let Some((_, limiter)) = self
            .per_endpoint
            .iter()
            .find(|(prefix, _)| endpoint.starts_with(**prefix))
        {
            limiter.acquire(priority).await;
        }
        self.global.acquire(priority).await;
    }

    fn matching_endpoint_limiter(&self, endpoint: &str) -> Option<&RateLimiter> {
        self.per_endpoint
            .iter()
            .find(|(prefix, _)| endpoint.starts_with(**prefix))
            .map(|(_, limiter)| limiter)
    }

    /// Report a rejected request (eg/ HTTP 429) against whichever limiter covers
    /// `endpoint`, triggering that limiter's backoff; falls back to the global
    /// limiter if no endpoint-specific entry matches.
    pub async fn report_violation(&self, endpoint: &str) {
        match self.matching_endpoint_limiter(endpoint) {
            Some(limiter) => limiter.report_violation().await,
            None => self.global.report_violation().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration, Instant};

    #[tokio::test]
    async fn test_rate_limit_basic() {
        let rl = RateLimiter::new(2, Duration::from_millis(50));
        rl.acquire(Priority::Normal).await;
        rl.acquire(Priority::Normal).await;
        let start = Instant::now();
        rl.acquire(Priority::Normal).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_priority_queue() {
        let rl = RateLimiter::new(1, Duration::from_millis(40));
        rl.acquire(Priority::Normal).await;
        let rl1 = rl.clone();
        let t1 = tokio::spawn(async move {
            rl1.acquire(Priority::Low).await;
            Instant::now()
        });
        sleep(Duration::from_millis(10)).await;
        let rl2 = rl.clone();
        let t2 = tokio::spawn(async move {
            rl2.acquire(Priority::High).await;
            Instant::now()
        });
        let time_high = t2.await.unwrap();
        let time_low = t1.await.unwrap();
        assert!(time_high <= time_low);
    }

    #[tokio::test]
    async fn test_min_delay_spacing() {
        // 0.5 rps, burst 2 -> requests 3..5 spaced ~2s apart.
        let rl = RateLimiter::from_rps(0.5, 2);
        let start = Instant::now();
        rl.acquire(Priority::Normal).await; // immediate (burst)
        rl.acquire(Priority::Normal).await; // immediate (burst)
        rl.acquire(Priority::Normal).await; // waits ~2s for refill
        assert!(start.elapsed() >= Duration::from_millis(1800));
    }
}
