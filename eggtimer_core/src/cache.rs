//! Caller-owned memoization of derived per-user values.
//!
//! Nothing here invalidates itself. Whoever writes flow events must call
//! [`CycleLengthCache::invalidate`] for that user before the next read.

use std::collections::HashMap;

/// Kind of value stored for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
    CycleLengths,
}

/// Cache key: one entry per user and kind
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub kind: CacheKind,
}

impl CacheKey {
    pub fn cycle_lengths(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            kind: CacheKind::CycleLengths,
        }
    }
}

/// In-memory cycle length cache
#[derive(Debug, Default)]
pub struct CycleLengthCache {
    entries: HashMap<CacheKey, Vec<i64>>,
    hits: u64,
    misses: u64,
}

impl CycleLengthCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, user_id: &str) -> Option<&[i64]> {
        match self.entries.get(&CacheKey::cycle_lengths(user_id)) {
            Some(lengths) => {
                self.hits += 1;
                Some(lengths.as_slice())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, user_id: &str, lengths: Vec<i64>) {
        self.entries.insert(CacheKey::cycle_lengths(user_id), lengths);
    }

    /// Drop everything cached for a user; returns whether anything was cached
    pub fn invalidate(&mut self, user_id: &str) -> bool {
        let removed = self
            .entries
            .remove(&CacheKey::cycle_lengths(user_id))
            .is_some();
        if removed {
            tracing::debug!("Invalidated cached cycle lengths for {}", user_id);
        }
        removed
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

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
