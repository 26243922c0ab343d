use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

// Idle keys are swept once the table grows past this, so a long-running
// process does not accumulate per-client state forever.
const SWEEP_THRESHOLD: usize = 512;

/// Recent hits for one client key.
#[derive(Debug, Default)]
struct KeyWindow {
    hits: VecDeque<Instant>,
}

impl KeyWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while self
            .hits
            .front()
            .is_some_and(|hit| now.duration_since(*hit) > window)
        {
            self.hits.pop_front();
        }
    }

    fn try_admit(&mut self, now: Instant, window: Duration, budget: usize) -> bool {
        self.prune(now, window);
        if self.hits.len() >= budget {
            return false;
        }
        self.hits.push_back(now);
        true
    }

    fn idle(&self, now: Instant, window: Duration) -> bool {
        self.hits
            .back()
            .map_or(true, |hit| now.duration_since(*hit) > window)
    }
}

/// Sliding-window request limiter keyed by client identity.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    keys: Arc<Mutex<HashMap<String, KeyWindow>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut keys = self.keys.lock();

        if keys.len() > SWEEP_THRESHOLD {
            let window = self.window;
            keys.retain(|_, entry| !entry.idle(now, window));
        }

        keys.entry(key.to_string())
            .or_default()
            .try_admit(now, self.window, self.max_requests)
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.keys.lock().len()
    }
}
