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

//! Lightweight in-process counters. No external exporter: callers read a
//! point-in-time snapshot instead.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache-side counters, bumped under the cache lock alongside the
/// mutation they describe.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub promotions: AtomicU64,
    pub evictions: AtomicU64,
    pub rejected_oversized: AtomicU64,
}

impl CacheMetrics {
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected_oversized: self.rejected_oversized.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub promotions: u64,
    pub evictions: u64,
    pub rejected_oversized: u64,
}

/// Proxy-side counters, one increment per connection outcome.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    pub connections_accepted: AtomicU64,
    pub requests_served_from_cache: AtomicU64,
    pub requests_forwarded: AtomicU64,
    pub client_errors: AtomicU64,
    pub origin_errors: AtomicU64,
}

impl ProxyMetrics {
    pub fn snapshot(&self) -> ProxyMetricsSnapshot {
        ProxyMetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            requests_served_from_cache: self.requests_served_from_cache.load(Ordering::Relaxed),
            requests_forwarded: self.requests_forwarded.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            origin_errors: self.origin_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyMetricsSnapshot {
    pub connections_accepted: u64,
    pub requests_served_from_cache: u64,
    pub requests_forwarded: u64,
    pub client_errors: u64,
    pub origin_errors: u64,
}
