//! Resolution cache.
//!
//! Resolved tables and forms are pure functions of the configuration, the
//! actor, the record and the evaluation date, so every one of those inputs
//! goes into the key. Entries never need invalidation; the cache is flushed
//! wholesale when it reaches its capacity.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::compose::{ResolvedForm, ResolvedTable};
use crate::types::{Actor, Record};

/// Which resolution an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Table,
    Form,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Form => "form",
        }
    }
}

/// Cache key for one resolution call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    pub kind: ResolutionKind,
    /// Context name
    pub context: String,
    /// Fingerprint of the configuration in force
    pub fingerprint: String,
    /// Hash over actor, record and date
    pub inputs_hash: String,
}

impl ResolutionKey {
    pub fn new(
        kind: ResolutionKind,
        context: &str,
        fingerprint: &str,
        actor: &Actor,
        record: Option<&Record>,
        today: NaiveDate,
    ) -> Self {
        #[derive(Serialize)]
        struct Inputs<'a> {
            actor: &'a Actor,
            record: Option<&'a Record>,
            today: NaiveDate,
        }

        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&Inputs { actor, record, today }).unwrap_or_default());
        let hash = hasher.finalize();

        Self {
            kind,
            context: context.to_string(),
            fingerprint: fingerprint.to_string(),
            inputs_hash: hex::encode(&hash[..16]),
        }
    }

    /// Format: kind:context:fingerprint:inputs_hash
    pub fn to_storage_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.kind.as_str(),
            self.context,
            self.fingerprint,
            self.inputs_hash
        )
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Table(ResolvedTable),
    Form(ResolvedForm),
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub flushes: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Concurrent store of resolved contexts.
pub struct ResolutionCache {
    entries: DashMap<String, Cached>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    flushes: AtomicU64,
}

impl ResolutionCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    fn lookup(&self, key: &ResolutionKey) -> Option<Cached> {
        let found = self.entries.get(&key.to_storage_key()).map(|entry| entry.value().clone());
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn store(&self, key: &ResolutionKey, value: Cached) {
        if self.entries.len() >= self.max_entries {
            warn!(
                entries = self.entries.len(),
                max_entries = self.max_entries,
                "Resolution cache full, flushing"
            );
            self.clear();
            self.flushes.fetch_add(1, Ordering::Relaxed);
        }
        self.entries.insert(key.to_storage_key(), value);
    }

    pub fn get_table(&self, key: &ResolutionKey) -> Option<ResolvedTable> {
        match self.lookup(key)? {
            Cached::Table(table) => Some(table),
            Cached::Form(_) => None,
        }
    }

    pub fn put_table(&self, key: &ResolutionKey, table: ResolvedTable) {
        self.store(key, Cached::Table(table));
    }

    pub fn get_form(&self, key: &ResolutionKey) -> Option<ResolvedForm> {
        match self.lookup(key)? {
            Cached::Form(form) => Some(form),
            Cached::Table(_) => None,
        }
    }

    pub fn put_form(&self, key: &ResolutionKey, form: ResolvedForm) {
        self.store(key, Cached::Form(form));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}
