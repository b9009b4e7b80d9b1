//! Time-limited cache of successful task outputs.
//!
//! Entries are keyed by task type plus the canonical JSON of the payload,
//! so two tasks with different ids but identical work share an entry.
//! Expired entries are dropped lazily when read.

use crate::core::task::Task;
use crate::tflog_trace;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A cached output and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Cache key for a task: `<type>-<payload JSON>`.
    ///
    /// `serde_json` keeps object keys sorted, so logically equal payloads
    /// produce the same key.
    pub fn key_for(task: &Task) -> String {
        format!("{}-{}", task.task_type, task.payload)
    }

    /// Look up the cached output for `task`, evicting it if expired.
    pub fn get(&mut self, task: &Task) -> Option<Value> {
        let key = Self::key_for(task);
        let now = Instant::now();

        let entry = self.entries.get(&key)?;
        if entry.is_expired(now) {
            tflog_trace!("Cache entry expired: {}", key);
            self.entries.remove(&key);
            return None;
        }

        tflog_trace!("Cache hit: {}", key);
        Some(entry.value.clone())
    }

    /// Store `value` as the output for `task` with the cache's TTL.
    pub fn insert(&mut self, task: &Task, value: Value) {
        self.entries.insert(
            Self::key_for(task),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
