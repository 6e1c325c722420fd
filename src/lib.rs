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

//! A concurrent caching HTTP forward proxy.

pub mod acceptor;
pub mod cache;
pub mod config;
pub mod error;
pub mod error_page;
pub mod forwarder;
pub mod io;
pub mod metrics;
pub mod parser;
pub mod rewriter;
pub mod worker;

pub use cache::Cache;
pub use config::ProxyConfig;
pub use error::{ProxyError, Result};
