//! Absent-resource tracking.
//!
//! A tile reported missing by the remote service is marked absent so the
//! probe stops asking for it. Marks decay: a key is considered absent while
//! it was marked recently or has failed more than `max_tries` times, and the
//! mark is forgotten entirely once `try_again_interval` has passed.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::traits::AbsentRegistry;

/// Default number of failed attempts before a key stays absent.
pub const DEFAULT_MAX_TRIES: u32 = 2;

/// Default interval during which a fresh mark is always honoured.
pub const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Default interval after which a mark is dropped.
pub const DEFAULT_TRY_AGAIN_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct AbsentEntry {
    tries: u32,
    last_marked: Instant,
}

/// Concurrent absent-resource list with time-based decay.
#[derive(Debug)]
pub struct AbsentResourceList {
    entries: DashMap<String, AbsentEntry>,
    max_tries: u32,
    min_check_interval: Duration,
    try_again_interval: Duration,
}

impl Default for AbsentResourceList {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_TRIES,
            DEFAULT_MIN_CHECK_INTERVAL,
            DEFAULT_TRY_AGAIN_INTERVAL,
        )
    }
}

impl AbsentResourceList {
    pub fn new(max_tries: u32, min_check_interval: Duration, try_again_interval: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_tries,
            min_check_interval,
            try_again_interval,
        }
    }

    /// Number of keys currently tracked (absent or decaying).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AbsentRegistry for AbsentResourceList {
    fn is_absent(&self, key: &str) -> bool {
        let Some(entry) = self.entries.get(key).map(|e| *e) else {
            return false;
        };

        let elapsed = entry.last_marked.elapsed();
        if elapsed > self.try_again_interval {
            self.entries.remove(key);
            return false;
        }
        elapsed < self.min_check_interval || entry.tries > self.max_tries
    }

    fn mark_absent(&self, key: &str) {
        let now = Instant::now();
        self.entries
            .entry(key.to_string())
            .and_modify(|e| {
                e.tries += 1;
                e.last_marked = now;
            })
            .or_insert(AbsentEntry {
                tries: 1,
                last_marked: now,
            });
    }

    fn unmark(&self, key: &str) {
        self.entries.remove(key);
    }
}
