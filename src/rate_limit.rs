// rate_limit.rs - Windowed Rate Limiter
// Purpose: Cap probe dispatches per one-second window for a single scan

use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Caps how many dispatches a scan issues per one-second window.
///
/// The policy is windowed, not token-bucket: after every `rps` dispatches,
/// if the current window has been open for less than a second, the
/// dispatcher sleeps out the remainder and a fresh window starts. A window
/// that already ran longer than a second triggers no pause and no catch-up,
/// so throughput is bursty at window boundaries.
pub struct WindowedLimiter {
    rps: usize,
    dispatched: usize,
    window_start: Instant,
}

impl WindowedLimiter {
    pub fn new(rps: usize) -> Self {
        Self {
            // A template declaring 0 RPS would never dispatch anything.
            rps: rps.max(1),
            dispatched: 0,
            window_start: Instant::now(),
        }
    }

    /// Account for one dispatch, pausing out the rest of the window once
    /// `rps` dispatches have been issued within it.
    pub async fn throttle(&mut self) {
        self.dispatched += 1;
        if self.dispatched >= self.rps {
            let elapsed = self.window_start.elapsed();
            if elapsed < Duration::from_secs(1) {
                sleep(Duration::from_secs(1) - elapsed).await;
            }
            self.dispatched = 0;
            self.window_start = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pauses_after_each_full_window() {
        let mut limiter = WindowedLimiter::new(5);
        let start = Instant::now();
        for _ in 0..12 {
            limiter.throttle().await;
        }
        // Dispatches 5 and 10 each close a window that opened only
        // milliseconds earlier, so close to two full seconds of pause.
        assert!(start.elapsed() >= Duration::from_millis(1800));
    }

    #[tokio::test]
    async fn overlong_window_is_not_compensated() {
        let mut limiter = WindowedLimiter::new(2);
        limiter.throttle().await;
        sleep(Duration::from_millis(1100)).await;

        let before = Instant::now();
        limiter.throttle().await;
        // The window already outlived its second; no pause and no catch-up.
        assert!(before.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn zero_rps_is_clamped_to_one() {
        let mut limiter = WindowedLimiter::new(0);
        let start = Instant::now();
        limiter.throttle().await;
        // With the clamp every dispatch closes its own window.
        assert!(start.elapsed() >= Duration::from_millis(900));
    }
}
