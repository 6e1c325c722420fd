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

//! CLI surface and runtime configuration.

use clap::Parser;

/// Bit-exact per the external interface contract.
pub const MAX_CACHE_SIZE: usize = 1_048_576;
pub const MAX_OBJECT_SIZE: usize = 102_400;

#[derive(Parser, Debug)]
#[command(name = "proxy", about = "A concurrent caching HTTP forward proxy")]
pub struct Args {
    /// TCP port to listen on.
    pub port: u16,

    /// Total cache size budget, in bytes.
    #[arg(long, default_value_t = MAX_CACHE_SIZE)]
    pub cache_size: usize,

    /// Largest single response eligible for caching, in bytes.
    #[arg(long, default_value_t = MAX_OBJECT_SIZE)]
    pub object_size: usize,
}

/// Resolved runtime configuration, independent of how it was supplied.
#[derive(Debug, Clone, Copy)]
pub struct ProxyConfig {
    pub port: u16,
    pub cache_size: usize,
    pub object_size: usize,
}

impl From<Args> for ProxyConfig {
    fn from(args: Args) -> Self {
        Self {
            port: args.port,
            cache_size: args.cache_size,
            object_size: args.object_size,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 0,
            cache_size: MAX_CACHE_SIZE,
            object_size: MAX_OBJECT_SIZE,
        }
    }
}
