//! Generation cache
//!
//! A bounded LRU keyed by a product tag plus a SHA-256 digest of every
//! request field that affects output pixels. Concurrent callers with the
//! same key are collapsed onto one render via a per-key slot: the first
//! caller renders while the rest block on the slot and receive the shared
//! result. Failed renders are never cached, so a later identical request
//! retries from scratch.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Default number of cached products.
pub const CACHE_CAPACITY: usize = 256;

/// Derive a cache key from a product tag and the serialized request fields.
/// Two semantically identical requests must serialize identically.
pub fn cache_key(tag: &str, fields: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fields.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(tag.len() + 1 + 64);
    hex.push_str(tag);
    hex.push(':');
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

struct LruEntry<V> {
    value: Arc<V>,
    last_used: u64,
}

struct LruInner<V> {
    entries: HashMap<String, LruEntry<V>>,
    tick: u64,
}

/// Bounded render cache with single-flight misses.
pub struct RenderCache<V> {
    capacity: usize,
    inner: Mutex<LruInner<V>>,
    pending: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> RenderCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LruInner { entries: HashMap::new(), tick: 0 }),
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, rendering it at most once across
    /// all concurrent callers. Render errors propagate uncached.
    pub fn get_or_render<E>(
        &self,
        key: &str,
        render: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        let slot = {
            let mut pending = self.pending.lock().expect("cache lock poisoned");
            pending.entry(key.to_string()).or_default().clone()
        };

        let mut guard = slot.lock().expect("cache lock poisoned");
        // A concurrent caller may have filled the slot while we waited
        if let Some(value) = guard.as_ref() {
            return Ok(Arc::clone(value));
        }
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        match render() {
            Ok(value) => {
                let value = Arc::new(value);
                *guard = Some(Arc::clone(&value));
                self.insert(key, Arc::clone(&value));
                self.pending.lock().expect("cache lock poisoned").remove(key);
                Ok(value)
            }
            Err(err) => {
                self.pending.lock().expect("cache lock poisoned").remove(key);
                Err(err)
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<Arc<V>> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.value))
    }

    fn insert(&self, key: &str, value: Arc<V>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(key.to_string(), LruEntry { value, last_used: tick });

        while inner.entries.len() > self.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => inner.entries.remove(&k),
                None => break,
            };
        }
    }
}

impl<V> Default for RenderCache<V> {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}
