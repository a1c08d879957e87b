//! Per-kind alert rate limiting

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use parking_lot::Mutex;

/// Minutes between two alerts of the same kind
pub const DEFAULT_ALERT_WINDOW_MINUTES: i64 = 60;

/// Lets an alert kind through at most once per window
#[derive(Debug)]
pub struct AlertThrottle {
    window: Duration,
    last_sent: Mutex<HashMap<String, NaiveDateTime>>,
}

impl Default for AlertThrottle {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_ALERT_WINDOW_MINUTES))
    }
}

impl AlertThrottle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// `true` (and the window restarts) if `kind` has not fired within the window
    pub fn try_acquire(&self, kind: &str, now: NaiveDateTime) -> bool {
        let mut last_sent = self.last_sent.lock();
        match last_sent.get(kind) {
            Some(last) if now < *last + self.window => false,
            _ => {
                last_sent.insert(kind.to_string(), now);
                true
            },
        }
    }
}
