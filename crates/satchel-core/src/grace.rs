//! Grace windows for transient disconnects

use satchel_util::MonotonicInstant;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Tracks an open grace window per key.
///
/// At most one window is open per key: arming a key that is already
/// armed cancels the prior window and opens a fresh one. Disarming
/// cancels the window; a window that survives until its deadline
/// qualifies via `take_due`.
#[derive(Debug)]
pub struct GraceBank<K> {
    grace: Duration,
    pending: HashMap<K, MonotonicInstant>,
}

impl<K: Eq + Hash + Clone> GraceBank<K> {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: HashMap::new(),
        }
    }

    /// Open a grace window for `key`, returning its deadline.
    pub fn arm(&mut self, key: K, now: MonotonicInstant) -> MonotonicInstant {
        let deadline = now + self.grace;
        self.pending.insert(key, deadline);
        deadline
    }

    /// Cancel the window for `key`. Returns true if one was open.
    pub fn disarm(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest deadline across all open windows.
    pub fn next_deadline(&self) -> Option<MonotonicInstant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every key whose window has elapsed.
    pub fn take_due(&mut self, now: MonotonicInstant) -> Vec<K> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &due {
            self.pending.remove(key);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
