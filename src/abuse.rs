//! Inbound flood protection
//!
//! Each connection gets its own fixed-window rate limiter. Frames over the
//! budget are dropped before they reach a room.

use std::time::{Duration, Instant};

/// Fixed-window limiter owned by a single connection
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Requests seen in the current window
    count: u32,
    window_start: Instant,
    /// Maximum requests per window
    max_requests: u32,
    /// Time window duration
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
            max_requests,
            window,
        }
    }

    /// Check if a request should be allowed
    /// Returns true if allowed, false if rate limited
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        // Check if we're in a new window
        if now.duration_since(self.window_start) >= self.window {
            self.count = 1;
            self.window_start = now;
            true
        } else if self.count >= self.max_requests {
            false
        } else {
            self.count += 1;
            true
        }
    }
}
