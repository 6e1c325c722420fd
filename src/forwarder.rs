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

//! Streams an origin response to the client, deciding at end-of-stream
//! whether it is eligible to be cached.
//!
//! The accumulation buffer is reused for both streaming and as the
//! cache-candidate storage, exactly as the source does. That means a
//! response spanning more than one read iteration is still streamed
//! correctly byte-for-byte, but only its *final* chunk would end up in
//! the buffer — so, as spec'd, only single-iteration responses are ever
//! offered to the cache. This is a preserved quirk of the source, not a
//! bug in this module (see the design notes).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::error::Result;
use crate::io::write_all;

use bytes::Bytes;

/// The outcome of forwarding one response.
pub struct ForwardOutcome {
    /// Total bytes read from origin and written to the client, in order.
    pub total_bytes: usize,
    /// `Some(bytes)` iff the whole response arrived in a single read and
    /// therefore is a candidate for [`crate::cache::Cache::insert`].
    pub cache_candidate: Option<Bytes>,
}

/// Reads from `origin` in blocks of at most `max_object_size` bytes,
/// writing each block to `client` before reading the next, until origin
/// reaches EOF. Any read error from origin or write error to client is
/// fatal to the exchange and propagated to the caller, who is expected to
/// tear down both connections.
pub async fn forward<R, W>(origin: &mut R, client: &mut W, max_object_size: usize) -> Result<ForwardOutcome>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; max_object_size];
    let mut total_bytes = 0usize;
    let mut iterations = 0usize;
    let mut last_chunk_len = 0usize;

    loop {
        let n = origin.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        write_all(client, &buf[..n]).await?;
        total_bytes += n;
        iterations += 1;
        last_chunk_len = n;
    }

    let cache_candidate = if iterations == 1 && last_chunk_len > 0 {
        Some(Bytes::copy_from_slice(&buf[..last_chunk_len]))
    } else {
        None
    };

    Ok(ForwardOutcome {
        total_bytes,
        cache_candidate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn single_block_response_is_cacheable() {
        let mut origin: &[u8] = b"abc";
        let mut client = Vec::new();
        let outcome = forward(&mut origin, &mut client, 1024).await.unwrap();
        assert_eq!(client, b"abc");
        assert_eq!(outcome.total_bytes, 3);
        assert_eq!(outcome.cache_candidate.as_deref(), Some(&b"abc"[..]));
    }

    #[test_log::test(tokio::test)]
    async fn multi_block_response_streams_fully_but_is_not_cached() {
        // max_object_size of 4 forces the 10-byte body across 3 reads.
        let mut origin: &[u8] = b"0123456789";
        let mut client = Vec::new();
        let outcome = forward(&mut origin, &mut client, 4).await.unwrap();
        assert_eq!(client, b"0123456789");
        assert_eq!(outcome.total_bytes, 10);
        assert!(outcome.cache_candidate.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn empty_response_is_not_cached() {
        let mut origin: &[u8] = b"";
        let mut client = Vec::new();
        let outcome = forward(&mut origin, &mut client, 1024).await.unwrap();
        assert_eq!(outcome.total_bytes, 0);
        assert!(outcome.cache_candidate.is_none());
    }

    #[test_log::test(tokio::test)]
    async fn response_larger_than_max_object_size_streams_fully_but_is_not_cached() {
        // Scenario B: a 200 KiB body against the default 100 KiB object
        // budget necessarily spans more than one read, so the client
        // still receives every byte but nothing is offered to the cache.
        let body = vec![7u8; 200 * 1024];
        let mut origin: &[u8] = &body;
        let mut client = Vec::new();
        let outcome = forward(&mut origin, &mut client, 100 * 1024).await.unwrap();
        assert_eq!(client, body);
        assert_eq!(outcome.total_bytes, 200 * 1024);
        assert!(outcome.cache_candidate.is_none());
    }
}
