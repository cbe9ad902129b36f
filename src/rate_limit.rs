//! Per-client request limiting
//!
//! Fixed one-minute windows keyed by client address. The limiter sits in
//! front of the cache, so cache hits count against the limit too.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::errors::GatewayError;
use config::RateLimitConfig;

/// Windows kept before expired ones are swept
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    period: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_period(config, Duration::from_secs(60))
    }

    pub fn with_period(config: &RateLimitConfig, period: Duration) -> Self {
        Self {
            enabled: config.enabled,
            limit: config.per_minute,
            period,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count one request for `client`, rejecting it once the window is full
    pub fn check(&self, client: &str) -> Result<(), GatewayError> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if windows.len() > SWEEP_THRESHOLD {
            let period = self.period;
            windows.retain(|_, window| now.duration_since(window.started) < period);
        }

        let window = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.duration_since(window.started);
        if elapsed >= self.period {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.limit {
            let remaining = self.period.saturating_sub(now.duration_since(window.started));
            return Err(GatewayError::RateLimited {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        window.count += 1;
        Ok(())
    }
}
