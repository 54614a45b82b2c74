//! Per-account recent-trade cache.
//!
//! A bounded newest-first buffer per account, serving "last N trades"
//! reads without touching the store. Purely a read shortcut: it is not
//! write-through, and any append for an account evicts that account's
//! whole buffer instead of patching it in place. An explicit object owned
//! by the service and passed by handle; there is no module-level instance.

use crate::domain::event::Event;
use std::collections::HashMap;
use std::sync::RwLock;

/// Buffer capacity per account.
pub const RECENT_CACHE_CAPACITY: usize = 20;

pub struct RecentTradeCache {
    capacity: usize,
    entries: RwLock<HashMap<String, Vec<Event>>>,
}

impl RecentTradeCache {
    pub fn new(capacity: usize) -> Self {
        RecentTradeCache {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serve up to `n` newest events for the account, or `None` on miss.
    /// A populated buffer with fewer than `n` entries is still a hit: the
    /// account simply has that few events.
    pub fn get(&self, account_id: &str, n: usize) -> Option<Vec<Event>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(account_id)
            .map(|buffer| buffer.iter().take(n).cloned().collect())
    }

    /// Install the account's buffer, newest first, truncated to capacity.
    pub fn populate(&self, account_id: &str, mut events: Vec<Event>) {
        events.truncate(self.capacity);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(account_id.to_string(), events);
    }

    /// Drop the account's buffer. Runs on every append for that account;
    /// the write lock is released before any subsequent read can observe
    /// the entry, so a later read repopulates from the store.
    pub fn invalidate(&self, account_id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(account_id);
    }

    pub fn is_cached(&self, account_id: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(account_id)
    }
}

impl Default for RecentTradeCache {
    fn default() -> Self {
        RecentTradeCache::new(RECENT_CACHE_CAPACITY)
    }
}
