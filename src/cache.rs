//! Bounded least-recently-used cache with resource release on eviction.
//!
//! Values implement [`Release`]. Whenever a value leaves the cache (eviction,
//! overwrite, removal, [`Cache::clear`], or drop of the cache itself) its
//! `release` is called exactly once; ownership of the value moves into the call,
//! so a released value can never be used or released again.
//!
//! The recency order is an index-linked list stored in a slot vector, with a
//! `HashMap` from key to slot. `get` and `put` are O(1).
//!
//! ```
//! use std::num::NonZeroUsize;
//! use adna_screen::cache::Cache;
//!
//! let mut cache: Cache<&str, String> = Cache::new(NonZeroUsize::new(2).unwrap());
//! cache.put("a", "1".to_string());
//! cache.put("b", "2".to_string());
//! cache.get(&"a");
//! cache.put("c", "3".to_string()); // evicts "b"
//! assert!(cache.peek(&"b").is_none());
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::{debug, error};

use crate::core::types::Label;

/// Capability of a cached value to release an external resource (e.g. close a file).
pub trait Release: Sized {
    /// Release any resource owned by the value.
    ///
    /// Returns `Ok(true)` if a resource was actually released. Plain values keep the
    /// default, which releases nothing.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while releasing (e.g. a failed flush).
    fn release(self) -> std::io::Result<bool> {
        Ok(false)
    }
}

impl Release for Label {}
impl Release for String {}
impl Release for usize {}

impl<T: Release> Release for Option<T> {
    fn release(self) -> std::io::Result<bool> {
        match self {
            Some(value) => value.release(),
            None => Ok(false),
        }
    }
}

/// Counters exposed by a [`Cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Evictions whose value released a resource
    pub forced_closes: u64,
    pub failed_releases: u64,
    pub size: usize,
}

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    entry: Option<(K, V)>,
    prev: usize,
    next: usize,
}

pub struct Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Release,
{
    capacity: NonZeroUsize,
    map: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    /// Most recently used
    head: usize,
    /// Least recently used
    tail: usize,
    stats: CacheStats,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Release,
{
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            ..self.stats
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Look up a value, promoting it to most recently used. Counts a hit or a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).map(|v| &*v)
    }

    /// Mutable counterpart of [`Cache::get`].
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&idx) = self.map.get(key) else {
            self.stats.misses += 1;
            return None;
        };
        self.stats.hits += 1;
        self.unlink(idx);
        self.push_front(idx);
        self.slots[idx].entry.as_mut().map(|(_, v)| v)
    }

    /// Look up a value without touching recency or counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let &idx = self.map.get(key)?;
        self.slots[idx].entry.as_ref().map(|(_, v)| v)
    }

    /// Insert or overwrite a value and make it most recently used.
    ///
    /// An overwritten value is released. When the cache is full, the least recently
    /// used entry is evicted and released first.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            let old = self.slots[idx]
                .entry
                .replace((key, value))
                .map(|(_, v)| v);
            self.unlink(idx);
            self.push_front(idx);
            if let Some(old) = old {
                self.release_value(old, false);
            }
            return;
        }

        if self.map.len() >= self.capacity.get() {
            self.evict_lru();
        }

        let slot = Slot {
            entry: Some((key.clone(), value)),
            prev: NIL,
            next: NIL,
        };
        let idx = if let Some(idx) = self.free.pop() {
            self.slots[idx] = slot;
            idx
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        };
        self.map.insert(key, idx);
        self.push_front(idx);
    }

    /// Remove and release an entry. Returns whether the key was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(idx) = self.map.remove(key) else {
            return false;
        };
        if let Some(value) = self.take_slot(idx) {
            self.release_value(value, false);
        }
        true
    }

    /// Remove and release every entry. Counters other than size are kept.
    pub fn clear(&mut self) {
        let mut idx = self.head;
        while idx != NIL {
            let next = self.slots[idx].next;
            if let Some((_, value)) = self.slots[idx].entry.take() {
                self.release_value(value, false);
            }
            idx = next;
        }
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        let mut idx = self.head;
        std::iter::from_fn(move || {
            while idx != NIL {
                let slot = &self.slots[idx];
                idx = slot.next;
                if let Some((key, _)) = &slot.entry {
                    return Some(key);
                }
            }
            None
        })
    }

    fn evict_lru(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }
        if let Some((key, _)) = &self.slots[idx].entry {
            self.map.remove(key);
        }
        if let Some(value) = self.take_slot(idx) {
            self.stats.evictions += 1;
            self.release_value(value, true);
        }
    }

    fn take_slot(&mut self, idx: usize) -> Option<V> {
        self.unlink(idx);
        self.free.push(idx);
        self.slots[idx].entry.take().map(|(_, v)| v)
    }

    fn release_value(&mut self, value: V, evicted: bool) {
        match value.release() {
            Ok(true) if evicted => {
                self.stats.forced_closes += 1;
                debug!(size = self.map.len(), "Released evicted cache entry");
            }
            Ok(_) => {}
            Err(e) => {
                self.stats.failed_releases += 1;
                error!(error = %e, "Failed to release cache entry");
            }
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev == NIL {
            if self.head == idx {
                self.head = next;
            }
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            if self.tail == idx {
                self.tail = prev;
            }
        } else {
            self.slots[next].prev = prev;
        }
        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

impl<K, V> Drop for Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Release,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Release,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Stand-in for an open handle; counts how often it was released.
    struct Handle {
        id: u32,
        released: Rc<Cell<u32>>,
    }

    impl Release for Handle {
        fn release(self) -> std::io::Result<bool> {
            self.released.set(self.released.get() + 1);
            Ok(true)
        }
    }

    fn handle(id: u32) -> (Handle, Rc<Cell<u32>>) {
        let released = Rc::new(Cell::new(0));
        (
            Handle {
                id,
                released: Rc::clone(&released),
            },
            released,
        )
    }

    fn cache<V: Release>(capacity: usize) -> Cache<String, V> {
        Cache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut c = cache(3);
        c.put("a".to_string(), 1usize);
        c.put("b".to_string(), 2);
        c.put("c".to_string(), 3);
        assert_eq!(c.get("a"), Some(&1));
        c.put("d".to_string(), 4);

        assert_eq!(c.len(), 3);
        assert!(!c.contains_key("b"));
        let keys: Vec<&String> = c.keys().collect();
        assert_eq!(keys, vec!["d", "a", "c"]);
        assert_eq!(c.stats().evictions, 1);
    }

    #[test]
    fn test_evicted_resource_released_once() {
        let mut c = cache(3);
        let (h1, r1) = handle(1);
        let (h2, r2) = handle(2);
        let (h3, r3) = handle(3);
        let (h4, r4) = handle(4);
        c.put("one".to_string(), h1);
        c.put("two".to_string(), h2);
        c.put("three".to_string(), h3);
        c.put("four".to_string(), h4);

        assert_eq!(r1.get(), 1);
        assert_eq!(r2.get(), 0);
        assert_eq!(c.stats().forced_closes, 1);

        drop(c);
        assert_eq!(r1.get(), 1);
        assert_eq!(r2.get(), 1);
        assert_eq!(r3.get(), 1);
        assert_eq!(r4.get(), 1);
    }

    #[test]
    fn test_hits_and_misses() {
        let mut c = cache(2);
        c.put("x".to_string(), 1usize);
        assert!(c.get("x").is_some());
        assert!(c.get("y").is_none());
        assert!(c.peek("y").is_none());
        let stats = c.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_overwrite_releases_old_value() {
        let mut c = cache(2);
        let (old, old_released) = handle(1);
        let (new, new_released) = handle(2);
        c.put("k".to_string(), old);
        c.put("k".to_string(), new);
        assert_eq!(old_released.get(), 1);
        assert_eq!(new_released.get(), 0);
        assert_eq!(c.len(), 1);
        assert_eq!(c.peek("k").map(|h| h.id), Some(2));
        assert_eq!(c.stats().forced_closes, 0);
    }

    #[test]
    fn test_remove_and_clear_release() {
        let mut c = cache(4);
        let (a, ra) = handle(1);
        let (b, rb) = handle(2);
        c.put("a".to_string(), a);
        c.put("b".to_string(), b);

        assert!(c.remove("a"));
        assert!(!c.remove("a"));
        assert_eq!(ra.get(), 1);

        c.clear();
        assert_eq!(rb.get(), 1);
        assert!(c.is_empty());

        drop(c);
        assert_eq!(ra.get(), 1);
        assert_eq!(rb.get(), 1);
    }

    #[test]
    fn test_slots_reused_after_eviction() {
        let mut c = cache(2);
        for i in 0..100usize {
            c.put(i.to_string(), i);
        }
        assert_eq!(c.len(), 2);
        assert!(c.slots.len() <= 3);
        assert_eq!(c.peek("99"), Some(&99));
        assert_eq!(c.peek("98"), Some(&98));
        assert_eq!(c.stats().evictions, 98);
    }

    #[test]
    fn test_capacity_one() {
        let mut c = cache(1);
        c.put("a".to_string(), 1usize);
        c.put("b".to_string(), 2);
        assert!(c.peek("a").is_none());
        assert_eq!(c.get("b"), Some(&2));
    }
}
