use crate::entry::{Fields, Level, LogEntry};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// Idle records kept by [`EntryPool::new`].
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Mutable working copy of a [`LogEntry`] used while formatting.
#[derive(Debug, Default)]
pub struct PooledEntry {
    pub message: String,
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub data: Fields,
}

impl PooledEntry {
    /// Copy `entry` into this record, merging `static_fields` underneath the
    /// entry's own fields.
    ///
    /// The field map is reset first, so nothing from a previous use of the
    /// record survives.
    pub fn fill(&mut self, entry: &LogEntry, static_fields: &Fields) {
        self.message.clear();
        self.message.push_str(&entry.message);
        self.level = entry.level;
        self.timestamp = entry.timestamp;

        self.data.clear();
        self.data.reserve(static_fields.len() + entry.fields.len());
        for (key, value) in static_fields {
            self.data.insert(key.clone(), value.clone());
        }
        for (key, value) in &entry.fields {
            self.data.insert(key.clone(), value.clone());
        }
    }

    fn reset(&mut self) {
        self.message.clear();
        self.data.clear();
    }
}

/// Concurrency-safe free list of [`PooledEntry`] records.
///
/// An empty pool never blocks or fails: `acquire` allocates a fresh record
/// instead.
#[derive(Debug)]
pub struct EntryPool {
    idle: Mutex<Vec<PooledEntry>>,
    max_idle: usize,
}

impl Default for EntryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Pool that keeps at most `max_idle` released records around.
    pub fn with_max_idle(max_idle: usize) -> Self {
        EntryPool {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take a record out of the pool. It goes back when the guard is dropped.
    pub fn acquire(&self) -> Pooled<'_> {
        let entry = self.idle.lock().pop().unwrap_or_default();
        Pooled { pool: self, entry }
    }

    /// Return a record for reuse. Its message and fields are cleared here.
    pub fn release(&self, mut entry: PooledEntry) {
        entry.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(entry);
        }
    }

    /// Number of records currently waiting for reuse.
    pub fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }
}

/// Guard over an acquired [`PooledEntry`].
pub struct Pooled<'a> {
    pool: &'a EntryPool,
    entry: PooledEntry,
}

impl Deref for Pooled<'_> {
    type Target = PooledEntry;

    fn deref(&self) -> &PooledEntry {
        &self.entry
    }
}

impl DerefMut for Pooled<'_> {
    fn deref_mut(&mut self) -> &mut PooledEntry {
        &mut self.entry
    }
}

impl Drop for Pooled<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.entry));
    }
}
