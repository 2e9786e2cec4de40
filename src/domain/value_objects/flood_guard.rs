use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FloodPolicy {
    pub window_seconds: i64,
    pub burst_limit: usize,
    pub min_interval_seconds: i64,
    pub history_capacity: usize,
}

impl Default for FloodPolicy {
    fn default() -> Self {
        Self {
            window_seconds: 15,
            burst_limit: 10,
            min_interval_seconds: 3,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Fixed-capacity ring of request timestamps (epoch seconds, oldest first).
///
/// Persisted as the `users.recent_request_timestamps` array; loaded, checked and written
/// back inside the same locked row update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodGuard {
    policy: FloodPolicy,
    entries: VecDeque<i64>,
}

impl FloodGuard {
    pub fn from_history(policy: FloodPolicy, history: &[i64]) -> Self {
        let capacity = policy.history_capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity + 1);
        let skip = history.len().saturating_sub(capacity);
        entries.extend(history.iter().skip(skip).copied());

        Self { policy, entries }
    }

    /// Records an attempt at `now` and reports whether it violates the policy.
    /// Denied attempts stay in the history.
    pub fn check(&mut self, now: i64) -> bool {
        self.entries.push_back(now);

        let window = self.policy.window_seconds;
        self.entries.retain(|t| now - *t <= window);

        let capacity = self.policy.history_capacity.max(1);
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }

        if self.entries.len() > self.policy.burst_limit {
            return true;
        }

        let len = self.entries.len();
        len >= 2 && self.entries[len - 1] - self.entries[len - 2] < self.policy.min_interval_seconds
    }

    pub fn into_history(self) -> Vec<i64> {
        self.entries.into()
    }
}
