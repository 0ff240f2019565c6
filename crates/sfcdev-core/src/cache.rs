//! Weighted LRU cache store and per-key freshness index.
//!
//! One shared store holds all three kinds of servable payloads
//! (compiled components, rewritten scripts, loaded packages) under a
//! single weight budget. Freshness is tracked separately: a key only
//! gets a freshness record when it was cached with a real source
//! timestamp, and module entries never get one.

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Default weight budget, `2 * payload length + key length` per entry.
pub const DEFAULT_MAX_WEIGHT: usize = 500;

fn entry_weight(key: &str, value: &str) -> usize {
    value.len() * 2 + key.len()
}

/// LRU map bounded by a cumulative weight budget rather than an entry
/// count.
///
/// Entries are kept in recency order, oldest at the front. `get`
/// promotes, `peek` does not, and `set` evicts from the front until the
/// running weight fits the budget again. A value that alone outweighs
/// the whole budget is not stored at all.
#[derive(Debug)]
pub struct WeightedLru {
    entries: IndexMap<String, String>,
    weight: usize,
    max_weight: usize,
}

impl WeightedLru {
    pub fn new(max_weight: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            weight: 0,
            max_weight,
        }
    }

    /// Look up a value and promote it to most-recently-used.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let index = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get(key).cloned()
    }

    /// Look up a value without touching recency order.
    pub fn peek(&self, key: &str) -> Option<&String> {
        self.entries.get(key)
    }

    /// Insert or replace a value, then evict least-recently-used
    /// entries until the store fits its budget.
    pub fn set(&mut self, key: String, value: String) {
        if let Some(old) = self.entries.shift_remove(&key) {
            self.weight -= entry_weight(&key, &old);
        }

        let weight = entry_weight(&key, &value);
        if weight > self.max_weight {
            // Too large to ever fit; caching it would evict everything
            // else for nothing.
            return;
        }

        self.weight += weight;
        self.entries.insert(key, value);

        while self.weight > self.max_weight {
            if let Some((old_key, old_value)) = self.entries.shift_remove_index(0) {
                self.weight -= entry_weight(&old_key, &old_value);
            } else {
                break;
            }
        }
    }

    /// Current cumulative weight.
    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

struct CacheInner {
    store: WeightedLru,
    freshness: FxHashMap<String, u64>,
}

/// Process-wide cache handle: the weighted LRU store plus the
/// freshness index, behind one lock so a lookup-then-write sequence
/// observes a consistent pair.
///
/// Constructed once at middleware creation and shared by reference;
/// there is no module-level singleton, so tests get isolated instances.
pub struct CacheService {
    inner: Mutex<CacheInner>,
}

impl CacheService {
    pub fn new(max_weight: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                store: WeightedLru::new(max_weight),
                freshness: FxHashMap::default(),
            }),
        }
    }

    /// Fetch a cached payload, promoting its recency.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().store.get(key)
    }

    /// Fetch a cached payload without promoting it.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.lock().store.peek(key).cloned()
    }

    /// The source mtime recorded when `key` was last cached, if any.
    /// Module entries and disabled freshness tracking leave no record.
    pub fn recorded_mtime(&self, key: &str) -> Option<u64> {
        self.inner.lock().freshness.get(key).copied()
    }

    /// Store a payload, recording its source timestamp when one is
    /// given.
    ///
    /// If the value is byte-identical to what is already cached the
    /// write is skipped entirely and `false` is returned; this avoids
    /// bumping recency and freshness metadata for no-op rewrites.
    pub fn cache_data(&self, key: &str, value: &str, update_time: Option<u64>) -> bool {
        let mut inner = self.inner.lock();

        if inner.store.peek(key).map(String::as_str) == Some(value) {
            return false;
        }

        inner.store.set(key.to_string(), value.to_string());
        if let Some(time) = update_time {
            inner.freshness.insert(key.to_string(), time);
        }
        true
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Current cumulative weight of the store.
    pub fn weight(&self) -> usize {
        self.inner.lock().store.weight()
    }
}
