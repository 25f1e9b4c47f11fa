//! Fixed-window rate limiting keyed by caller identity.
//!
//! Each limited endpoint class (AI extraction, email sending) holds its own
//! limiter instance with its own quota. The window resets entirely at the
//! boundary; there is no sliding credit.

use axum::http::HeaderMap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fallback bucket for callers that present no forwarding headers.
/// All such callers share one quota.
pub const UNKNOWN_CLIENT_KEY: &str = "unknown";

/// Entry cap before expired windows are swept, to bound memory under
/// hostile traffic.
const MAX_TRACKED_KEYS: usize = 10_000;

/// Time source for the limiter, injectable so tests can drive the window.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source used in production.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time source for tests.
pub struct ManualClock {
    base: Instant,
    offset: std::sync::Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: std::sync::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("clock lock poisoned");
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("clock lock poisoned")
    }
}

struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Keyed fixed-window request counter.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, WindowEntry>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            clock,
            entries: DashMap::new(),
        }
    }

    /// Check the caller's quota and consume one unit of it.
    ///
    /// Returns `false` without incrementing once the limit is reached; the
    /// first call after the window elapses resets the count to 1.
    pub fn check_and_consume(&self, key: &str) -> bool {
        let now = self.clock.now();

        if self.entries.len() >= MAX_TRACKED_KEYS {
            self.sweep_expired(now);
        }

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) > self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.limit {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Seconds until the caller's current window expires, for the
    /// Retry-After response header.
    pub fn retry_after_secs(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        self.entries.get(key).map(|entry| {
            self.window
                .saturating_sub(now.duration_since(entry.window_start))
                .as_secs()
        })
    }

    /// Number of currently tracked caller keys.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    fn sweep_expired(&self, now: Instant) {
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) <= self.window);
    }
}

/// Derive the caller identity key from proxy forwarding headers.
///
/// Uses the first `x-forwarded-for` entry, then `x-real-ip`, falling back to
/// a shared "unknown" bucket when neither is present.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT_KEY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter(limit: u32, window_secs: u64) -> (FixedWindowLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter =
            FixedWindowLimiter::with_clock(limit, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn denies_request_past_the_limit() {
        let (limiter, _clock) = limiter(3, 3600);

        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(!limiter.check_and_consume("1.2.3.4"));
        // Denied calls do not consume.
        assert!(!limiter.check_and_consume("1.2.3.4"));
    }

    #[test]
    fn window_elapse_resets_count_to_one() {
        let (limiter, clock) = limiter(2, 3600);

        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(!limiter.check_and_consume("1.2.3.4"));

        clock.advance(Duration::from_secs(3601));

        // Fresh window: allowed again, count restarts at 1.
        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(!limiter.check_and_consume("1.2.3.4"));
    }

    #[test]
    fn keys_have_independent_windows() {
        let (limiter, _clock) = limiter(1, 3600);

        assert!(limiter.check_and_consume("1.2.3.4"));
        assert!(!limiter.check_and_consume("1.2.3.4"));
        assert!(limiter.check_and_consume("5.6.7.8"));
    }

    #[test]
    fn retry_after_counts_down_the_window() {
        let (limiter, clock) = limiter(1, 3600);

        assert!(limiter.check_and_consume("1.2.3.4"));
        clock.advance(Duration::from_secs(600));
        assert_eq!(limiter.retry_after_secs("1.2.3.4"), Some(3000));
    }

    #[test]
    fn expired_entries_are_swept_at_the_cap() {
        let (limiter, clock) = limiter(1, 60);

        for i in 0..MAX_TRACKED_KEYS {
            assert!(limiter.check_and_consume(&format!("10.0.{}.{}", i / 256, i % 256)));
        }
        assert_eq!(limiter.tracked_keys(), MAX_TRACKED_KEYS);

        clock.advance(Duration::from_secs(61));
        assert!(limiter.check_and_consume("fresh-caller"));
        assert!(limiter.tracked_keys() < MAX_TRACKED_KEYS);
    }

    #[test]
    fn client_key_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_key(&headers), "10.0.0.2");

        assert_eq!(client_key(&HeaderMap::new()), UNKNOWN_CLIENT_KEY);
    }
}
