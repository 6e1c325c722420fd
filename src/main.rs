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

use std::sync::Arc;

use clap::Parser;
use proxylab::config::{Args, ProxyConfig};
use proxylab::{acceptor, metrics::ProxyMetrics, Cache};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config: ProxyConfig = Args::parse().into();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    let cache = Cache::new(config.cache_size, config.object_size);
    let metrics = Arc::new(ProxyMetrics::default());

    tokio::select! {
        result = acceptor::run(config, cache.clone(), metrics.clone()) => {
            result
        }
        _ = tokio::signal::ctrl_c() => {
            let cache_snapshot = cache.metrics().snapshot();
            let proxy_snapshot = metrics.snapshot();
            tracing::info!(?cache_snapshot, ?proxy_snapshot, "shutting down on ctrl-c");
            Ok(())
        }
    }
}
