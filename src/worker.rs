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

//! The per-connection state machine: parse the request, consult the
//! cache, and either serve a hit directly or fetch from origin and
//! stream the response back, inserting it into the cache if eligible.
//!
//! Every exit path — success or any error — drops the client socket, the
//! origin socket (if one was ever opened), and any held cache handle, by
//! ordinary Rust scoping rather than an explicit teardown step.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::cache::Cache;
use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::error_page;
use crate::forwarder;
use crate::io::{write_all, LineReader};
use crate::metrics::ProxyMetrics;
use crate::parser::ParsedRequest;
use crate::rewriter;

/// Drives one accepted connection to completion. Never propagates an
/// error to the caller: every failure is logged here and simply ends the
/// task, matching "each worker is its own failure domain" (the acceptor
/// keeps running regardless of what any one worker does).
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, cache: Cache, config: Arc<ProxyConfig>, metrics: Arc<ProxyMetrics>) {
    metrics.connections_accepted.fetch_add(1, Ordering::Relaxed);

    if let Err(err) = run(stream, &cache, &config, &metrics).await {
        tracing::warn!(%peer, error = %err, "connection worker exited with error");
    }
}

async fn run(stream: TcpStream, cache: &Cache, config: &ProxyConfig, metrics: &ProxyMetrics) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = LineReader::new(read_half);

    let request_line = match reader.read_line().await? {
        Some(line) => line,
        // Client closed the connection before sending a request line;
        // nothing to parse, nothing to reply to.
        None => return Ok(()),
    };
    let header_lines = reader.read_headers().await?;

    // `ParsedRequest::parse` already enforces the scheme/version legality
    // spec.md's state diagram shows as separate branches after PARSED;
    // folding them into parsing means every rejection still produces the
    // exact status code spec.md calls for, just checked in one pass.
    let request = match ParsedRequest::parse(&request_line, &header_lines) {
        Ok(request) => request,
        Err(err) => {
            metrics.client_errors.fetch_add(1, Ordering::Relaxed);
            reply_error(&mut write_half, &err).await;
            return Ok(());
        }
    };

    if request.method != "GET" {
        metrics.client_errors.fetch_add(1, Ordering::Relaxed);
        reply_error(&mut write_half, &ProxyError::UnsupportedMethod(request.method.clone())).await;
        return Ok(());
    }

    if let Some(handle) = cache.get(&request.uri) {
        tracing::debug!(uri = %request.uri, "cache hit");
        write_all(&mut write_half, &handle).await?;
        metrics.requests_served_from_cache.fetch_add(1, Ordering::Relaxed);
        // `handle` is released (refcount decremented, freed if it was
        // the last reference) here, whether or not the write succeeded.
        return Ok(());
    }
    cache.record_miss();

    let origin = match TcpStream::connect((request.host.as_str(), request.port)).await {
        Ok(origin) => origin,
        Err(err) => {
            metrics.origin_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(host = %request.host, port = request.port, error = %err, "origin connect failed");
            return Ok(());
        }
    };
    let (mut origin_read, mut origin_write) = origin.into_split();

    let outbound = rewriter::rewrite(&request)?;
    write_all(&mut origin_write, &outbound).await?;

    let outcome = forwarder::forward(&mut origin_read, &mut write_half, config.object_size).await?;
    if let Some(candidate) = outcome.cache_candidate {
        cache.insert(request.uri.clone(), candidate);
    }
    metrics.requests_forwarded.fetch_add(1, Ordering::Relaxed);

    Ok(())
}

async fn reply_error(write_half: &mut tokio::net::tcp::OwnedWriteHalf, err: &ProxyError) {
    let Some((code, short)) = err.client_status() else {
        tracing::warn!(error = %err, "unreportable error, closing connection");
        return;
    };
    let page = error_page::render(code, short, &err.to_string());
    // Best-effort: if the client has already gone away there is nothing
    // further to do but close.
    let _ = write_all(write_half, &page).await;
}
