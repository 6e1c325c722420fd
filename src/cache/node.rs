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

//! The intrusive LRU node and the raw list-surgery operations over it.
//!
//! A [`Node`] is heap-allocated once via `Box` and from then on lives
//! behind a raw `NonNull` pointer: the cache's index and its LRU list are
//! both just collections of pointers into the same allocation. This is
//! the same shape as `foyer-memory`'s `BaseHandle` + intrusive eviction
//! container, simplified to a single non-generic LRU (no pluggable
//! eviction policy, no sharding).

use std::ptr::NonNull;

use bytes::Bytes;

/// One cached entry. `refs` counts logical holders: the LRU list itself
/// holds one reference while `in_cache` is `true`; each outstanding
/// [`super::CacheHandle`] (from `get`) holds one more. The node is freed
/// exactly when `refs` reaches zero, which may happen well after eviction
/// if a reader is still holding it.
pub(super) struct Node {
    pub(super) key: String,
    pub(super) value: Bytes,
    pub(super) size: usize,
    pub(super) refs: usize,
    /// Whether the node is currently linked into the index + LRU list.
    pub(super) in_cache: bool,
    pub(super) prev: Option<NonNull<Node>>,
    pub(super) next: Option<NonNull<Node>>,
}

impl Node {
    pub(super) fn new_boxed(key: String, value: Bytes, size: usize) -> NonNull<Node> {
        let node = Box::new(Node {
            key,
            value,
            size,
            refs: 1,
            in_cache: true,
            prev: None,
            next: None,
        });
        unsafe { NonNull::new_unchecked(Box::into_raw(node)) }
    }
}

/// An intrusive doubly-linked list threaded through [`Node::prev`]/
/// [`Node::next`]. `head` is the most-recently-used end, `tail` the
/// least-recently-used end — eviction always pops from `tail`.
#[derive(Default)]
pub(super) struct List {
    pub(super) head: Option<NonNull<Node>>,
    pub(super) tail: Option<NonNull<Node>>,
}

impl List {
    /// Unlinks `ptr` from wherever it currently sits in the list. The
    /// caller must ensure `ptr` is actually a member of this list.
    ///
    /// # Safety
    /// `ptr` must point to a live, fully initialized `Node` that is
    /// currently linked into this list.
    pub(super) unsafe fn unlink(&mut self, mut ptr: NonNull<Node>) {
        let (prev, next) = {
            let node = ptr.as_mut();
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(mut prev) => prev.as_mut().next = next,
            None => self.head = next,
        }
        match next {
            Some(mut next) => next.as_mut().prev = prev,
            None => self.tail = prev,
        }
    }

    /// Pushes `ptr` onto the head (MRU) end. `ptr` must not already be
    /// linked into any list.
    ///
    /// # Safety
    /// `ptr` must point to a live, fully initialized, currently-unlinked
    /// `Node`.
    pub(super) unsafe fn push_front(&mut self, mut ptr: NonNull<Node>) {
        {
            let node = ptr.as_mut();
            node.prev = None;
            node.next = self.head;
        }
        match self.head {
            Some(mut head) => head.as_mut().prev = Some(ptr),
            None => self.tail = Some(ptr),
        }
        self.head = Some(ptr);
    }

    /// Moves an already-linked `ptr` to the head (MRU) end.
    ///
    /// # Safety
    /// `ptr` must point to a live, fully initialized `Node` currently
    /// linked into this list.
    pub(super) unsafe fn move_to_front(&mut self, ptr: NonNull<Node>) {
        if self.head == Some(ptr) {
            return;
        }
        self.unlink(ptr);
        self.push_front(ptr);
    }

    /// Pops the tail (LRU) node off the list, if any.
    pub(super) fn pop_back(&mut self) -> Option<NonNull<Node>> {
        let tail = self.tail?;
        unsafe { self.unlink(tail) };
        Some(tail)
    }
}
