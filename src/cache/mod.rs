//  Copyright 2024 Foyer Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! A bounded, byte-budget, reference-counted LRU cache mapping URI keys
//! to opaque response bytes.
//!
//! All mutation (`insert`, `get`, and the implicit `release` on
//! [`CacheHandle`] drop) happens under a single `parking_lot::Mutex`, as
//! required: this is a hint cache shared by many connection workers, not
//! a performance-critical sharded structure, and the entries it holds
//! never move or get mutated once inserted, so reads of a handle's bytes
//! are safe to do outside the lock.

mod node;

use std::collections::HashMap;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use self::node::{List, Node};
use crate::metrics::CacheMetrics;

struct Inner {
    index: HashMap<String, NonNull<Node>>,
    list: List,
    total_size: usize,
}

// `Inner` is only ever touched behind `Cache`'s mutex, and the pointers it
// holds always point at heap allocations owned by the cache (directly) or
// by an outstanding `CacheHandle` (which itself carries an `Arc<Shared>`
// keeping the cache, and therefore the lock, alive). Safe to send across
// threads under that discipline.
unsafe impl Send for Inner {}

struct Shared {
    inner: Mutex<Inner>,
    capacity: usize,
    max_object_size: usize,
    metrics: CacheMetrics,
}

/// A shared handle to the cache. Cheap to clone (it's an `Arc` underneath)
/// and meant to be handed to every connection worker.
#[derive(Clone)]
pub struct Cache {
    shared: Arc<Shared>,
}

impl Cache {
    /// Builds an empty cache with the given total-size budget and
    /// per-object size limit.
    pub fn new(capacity: usize, max_object_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    index: HashMap::new(),
                    list: List::default(),
                    total_size: 0,
                }),
                capacity,
                max_object_size,
                metrics: CacheMetrics::default(),
            }),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.shared.metrics
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn max_object_size(&self) -> usize {
        self.shared.max_object_size
    }

    /// Sum of the `size` of every entry currently held by the cache.
    pub fn usage(&self) -> usize {
        self.shared.inner.lock().total_size
    }

    /// Inserts `value` under `key`.
    ///
    /// Rejects (returns `false`, state unchanged) when `value.len() >
    /// max_object_size`. If `key` is already present, the existing entry
    /// is promoted to most-recently-used and its bytes are left as-is —
    /// duplicate inserts do not overwrite (see the design notes: this
    /// preserves the source's "promote, don't replace" contract rather
    /// than "fixing" it). Otherwise a new entry is created and entries
    /// are evicted from the least-recently-used end until the cache is
    /// back under budget.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Bytes>) -> bool {
        let key = key.into();
        let value = value.into();
        let size = value.len();

        if size > self.shared.max_object_size {
            self.shared.metrics.rejected_oversized.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return false;
        }

        let mut inner = self.shared.inner.lock();

        if let Some(&ptr) = inner.index.get(&key) {
            unsafe { inner.list.move_to_front(ptr) };
            self.shared.metrics.promotions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return true;
        }

        let ptr = Node::new_boxed(key.clone(), value, size);
        inner.index.insert(key, ptr);
        unsafe { inner.list.push_front(ptr) };
        inner.total_size += size;
        self.shared.metrics.inserts.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        self.evict_locked(&mut inner);

        true
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit and
    /// returning a handle whose bytes stay valid until the handle is
    /// dropped. Never blocks on a concurrent insert of the same key —
    /// this is a hint cache, not a coalescing one.
    pub fn get(&self, key: &str) -> Option<CacheHandle> {
        let mut inner = self.shared.inner.lock();
        let mut ptr = *inner.index.get(key)?;

        unsafe { inner.list.move_to_front(ptr) };
        unsafe { ptr.as_mut().refs += 1 };

        self.shared.metrics.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        Some(CacheHandle {
            shared: self.shared.clone(),
            ptr,
        })
    }

    /// Records a miss. Split out from `get` so callers can report misses
    /// without a second lock acquisition in the common lookup path.
    pub fn record_miss(&self) {
        self.shared.metrics.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Evicts from the LRU tail until the cache is back under budget.
    /// Must be called with `inner` already locked.
    fn evict_locked(&self, inner: &mut Inner) {
        while inner.total_size > self.shared.capacity {
            let Some(mut ptr) = inner.list.pop_back() else {
                break;
            };
            let node = unsafe { ptr.as_mut() };
            debug_assert!(node.in_cache);
            node.in_cache = false;
            inner.index.remove(&node.key);
            inner.total_size -= node.size;
            self.shared.metrics.evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

            node.refs -= 1;
            if node.refs == 0 {
                drop(unsafe { Box::from_raw(ptr.as_ptr()) });
            }
        }
    }
}

fn release(shared: &Shared, mut ptr: NonNull<Node>) {
    let mut inner = shared.inner.lock();
    let node = unsafe { ptr.as_mut() };
    debug_assert!(node.refs > 0);
    node.refs -= 1;
    if node.refs == 0 {
        debug_assert!(!node.in_cache);
        drop(inner);
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// A read-only, reference-counted view of a cache entry obtained from
/// [`Cache::get`]. The entry's bytes are guaranteed not to move or be
/// freed until this handle is dropped, even if the entry is evicted by a
/// concurrent insert in the meantime.
pub struct CacheHandle {
    shared: Arc<Shared>,
    ptr: NonNull<Node>,
}

impl CacheHandle {
    pub fn key(&self) -> &str {
        unsafe { &self.ptr.as_ref().key }
    }

    pub fn value(&self) -> &Bytes {
        unsafe { &self.ptr.as_ref().value }
    }

    pub fn size(&self) -> usize {
        unsafe { self.ptr.as_ref().size }
    }
}

impl Deref for CacheHandle {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.value()
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        release(&self.shared, self.ptr);
    }
}

// The node behind `ptr` only moves between the cache's list/index and an
// outstanding handle, both of which are gated by `shared.inner`'s lock;
// the handle's own fields (`shared`, `ptr`) are plain `Arc`/`NonNull` and
// safe to move/share across threads under that discipline.
unsafe impl Send for CacheHandle {}
unsafe impl Sync for CacheHandle {}
