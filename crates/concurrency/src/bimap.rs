//! Thread-safe bimap from an interned key to a dense `J`.
//!
//! A `DashMap` gives lock-free reads and per-shard-locked writes on the
//! hot `intern`/`lookup`/`contains` path — an individual operation only
//! acquires the shard mutex for the bucket its key hashes into. A
//! separate `RwLock<()>` around the whole bimap gives `renumber` a "no
//! concurrent readers during renumber" guarantee without forcing every
//! normal operation to serialize on a single lock: normal operations
//! only take the *read* side of that lock, which is itself lock-free
//! under `parking_lot` in the uncontended case.

use crate::error::{Error, Result};
use crate::renumbering::Renumbering;
use dashmap::DashMap;
use lre_core::{Limits, J};
use parking_lot::RwLock;
use std::hash::Hash;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Shared behavior of `FeatureMap` and `ProductMap` — the key type differs
/// only in hash and equality, so a single trait covers both.
pub trait Bimap<K: Eq + Hash + Clone> {
    /// Insert `key` if absent and return its `J`; return the existing `J`
    /// otherwise. Thread-safe and linearizable per key.
    fn intern(&self, key: K) -> Result<J>;

    /// Look up the `J` for `key`, if interned.
    fn lookup(&self, key: &K) -> Option<J>;

    /// `true` if `key` has been interned.
    fn contains(&self, key: &K) -> bool;

    /// Look up the key for a `J`. Only valid after [`Bimap::sync_j_to_key`]
    /// has observed this `J`'s insertion.
    fn j_to_key(&self, j: J) -> Option<Arc<K>>;

    /// Materialize a dense `J`-indexed view of all interned keys.
    /// Required after a batch of inserts before `j_to_key` queries are legal.
    fn sync_j_to_key(&self);

    /// Apply a renumbering: removes tombstoned J's and re-densifies the
    /// remainder. No concurrent readers are allowed during this call.
    fn renumber(&self, renumbering: &Renumbering);

    /// Current number of live entries.
    fn len(&self) -> usize;

    /// `true` if there are no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generic thread-safe bimap implementation shared by `FeatureMap` and
/// `ProductMap`.
pub struct ConcurrentBimap<K: Eq + Hash + Clone> {
    limits: Limits,
    key_to_j: DashMap<K, J>,
    next_j: Arc<AtomicU32>,
    // Dense J -> key view. `None` at an index means either "not yet
    // synced" or "tombstoned" — callers must not rely on `j_to_key`
    // before a `sync_j_to_key` call that postdates the relevant insert.
    j_to_key: RwLock<Vec<Option<Arc<K>>>>,
}

impl<K: Eq + Hash + Clone> ConcurrentBimap<K> {
    /// Create an empty bimap with the given resource limits and its own
    /// private J counter.
    pub fn new(limits: Limits) -> Self {
        Self::with_counter(limits, Arc::new(AtomicU32::new(0)))
    }

    /// Create an empty bimap that draws J's from a `counter` shared with
    /// another bimap. `FeatureMap` and `ProductMap` must share one counter
    /// so that atomic and product J's occupy one dense space with the
    /// "parent atomic J < child product J" dependees invariant
    /// — a fresh per-map counter would let both maps
    /// hand out J `0` independently.
    pub fn with_counter(limits: Limits, counter: Arc<AtomicU32>) -> Self {
        Self {
            limits,
            key_to_j: DashMap::new(),
            next_j: counter,
            j_to_key: RwLock::new(Vec::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> Default for ConcurrentBimap<K> {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl<K: Eq + Hash + Clone> Bimap<K> for ConcurrentBimap<K> {
    fn intern(&self, key: K) -> Result<J> {
        // Fast path: already interned. `DashMap::get` only locks the
        // shard the key hashes into.
        if let Some(existing) = self.key_to_j.get(&key) {
            return Ok(*existing);
        }

        // `entry` locks only the target shard for the duration of the
        // closure, so two threads racing to intern the *same* key still
        // settle on a single J (the second arrival sees the first's
        // insert via the shard lock and its `or_try_insert_with` never
        // runs).
        let mut overflow: Option<Error> = None;
        let entry = self.key_to_j.entry(key).or_insert_with(|| {
            let j = self.next_j.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.limits.check_j(j.wrapping_add(1)) {
                overflow = Some(Error::Core(e));
            }
            j
        });
        if let Some(e) = overflow {
            return Err(e);
        }
        Ok(*entry)
    }

    fn lookup(&self, key: &K) -> Option<J> {
        self.key_to_j.get(key).map(|e| *e)
    }

    fn contains(&self, key: &K) -> bool {
        self.key_to_j.contains_key(key)
    }

    fn j_to_key(&self, j: J) -> Option<Arc<K>> {
        let view = self.j_to_key.read();
        view.get(j as usize).and_then(|slot| slot.clone())
    }

    fn sync_j_to_key(&self) {
        let size = self.next_j.load(Ordering::Acquire) as usize;
        let mut view = self.j_to_key.write();
        if view.len() < size {
            view.resize(size, None);
        }
        for entry in self.key_to_j.iter() {
            let j = *entry.value();
            if (j as usize) < view.len() && view[j as usize].is_none() {
                view[j as usize] = Some(Arc::new(entry.key().clone()));
            }
        }
    }

    fn renumber(&self, renumbering: &Renumbering) {
        tracing::debug!(
            old_size = self.next_j.load(Ordering::Acquire),
            new_size = renumbering.new_size(),
            "renumbering bimap"
        );
        // Exclusive: take the write lock on the dense view first so no
        // reader observes a half-renumbered state, then rebuild the
        // DashMap entirely before releasing it.
        let mut view = self.j_to_key.write();

        let mut fresh: Vec<Option<Arc<K>>> = vec![None; renumbering.new_size() as usize];
        for (old_j, new_j) in renumbering.survivors() {
            if let Some(Some(key)) = view.get(old_j as usize) {
                fresh[new_j as usize] = Some(key.clone());
            }
        }

        self.key_to_j.clear();
        for (new_j, slot) in fresh.iter().enumerate() {
            if let Some(key) = slot {
                self.key_to_j.insert((**key).clone(), new_j as J);
            }
        }
        self.next_j.store(renumbering.new_size(), Ordering::Release);
        *view = fresh;
    }

    fn len(&self) -> usize {
        self.key_to_j.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent_per_key() {
        let bimap: ConcurrentBimap<String> = ConcurrentBimap::default();
        let j1 = bimap.intern("a".to_string()).unwrap();
        let j2 = bimap.intern("a".to_string()).unwrap();
        assert_eq!(j1, j2);
        let j3 = bimap.intern("b".to_string()).unwrap();
        assert_ne!(j1, j3);
    }

    #[test]
    fn j_to_key_requires_sync() {
        let bimap: ConcurrentBimap<String> = ConcurrentBimap::default();
        let j = bimap.intern("x".to_string()).unwrap();
        assert!(bimap.j_to_key(j).is_none());
        bimap.sync_j_to_key();
        assert_eq!(bimap.j_to_key(j).map(|k| (*k).clone()), Some("x".to_string()));
    }

    #[test]
    fn concurrent_intern_of_same_key_settles_on_one_j() {
        use std::sync::Arc as StdArc;
        use std::thread;

        let bimap = StdArc::new(ConcurrentBimap::<String>::default());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let b = StdArc::clone(&bimap);
            handles.push(thread::spawn(move || b.intern("shared".to_string()).unwrap()));
        }
        let results: Vec<J> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|&j| j == results[0]));
        assert_eq!(bimap.len(), 1);
    }

    #[test]
    fn renumber_compacts_and_preserves_order() {
        let bimap: ConcurrentBimap<String> = ConcurrentBimap::default();
        let ja = bimap.intern("a".to_string()).unwrap();
        let jb = bimap.intern("b".to_string()).unwrap();
        let jc = bimap.intern("c".to_string()).unwrap();
        bimap.sync_j_to_key();

        let mut removed = vec![false; 3];
        removed[jb as usize] = true;
        let renumbering = Renumbering::from_removed(3, &removed).unwrap();
        bimap.renumber(&renumbering);

        assert_eq!(bimap.len(), 2);
        assert_eq!(bimap.lookup(&"a".to_string()), Some(renumbering.get(ja)));
        assert_eq!(bimap.lookup(&"c".to_string()), Some(renumbering.get(jc)));
        assert_eq!(bimap.lookup(&"b".to_string()), None);
        assert_eq!(
            bimap.j_to_key(renumbering.get(ja)).map(|k| (*k).clone()),
            Some("a".to_string())
        );
    }

    #[test]
    fn j_counter_overflow_is_rejected() {
        let bimap: ConcurrentBimap<u32> =
            ConcurrentBimap::new(Limits { max_j: 2, max_csr_len: u64::MAX });
        assert!(bimap.intern(0).is_ok());
        assert!(bimap.intern(1).is_ok());
        assert!(bimap.intern(2).is_err());
    }
}
