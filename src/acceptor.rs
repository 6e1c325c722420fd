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

//! Binds the listening socket and spawns one worker task per accepted
//! connection. A failure on any one connection never stops the loop;
//! only a failure to bind or to accept at all is fatal.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::cache::Cache;
use crate::config::ProxyConfig;
use crate::metrics::ProxyMetrics;
use crate::worker;

/// Runs the accept loop until the process is told to stop. Returns only
/// on a fatal listener error.
pub async fn run(config: ProxyConfig, cache: Cache, metrics: Arc<ProxyMetrics>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, cache_size = config.cache_size, object_size = config.object_size, "proxy listening");

    let config = Arc::new(config);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");

        let cache = cache.clone();
        let config = config.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            worker::handle_connection(stream, peer, cache, config, metrics).await;
        });
    }
}
