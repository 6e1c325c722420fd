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

//! Crate-wide error type for the proxy's request/response pipeline.

use thiserror::Error;

/// Errors surfaced while parsing, rewriting, or forwarding a single
/// client request. Each variant maps onto one row of the error taxonomy
/// in the system design: some are reported to the client as an HTTP error
/// page, others are only logged before the connection is torn down.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("malformed request: {0}")]
    Parse(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("unsupported http version: {0}")]
    UnsupportedVersion(String),

    #[error("failed to connect to origin: {0}")]
    Connect(#[source] std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rewritten request exceeds the outbound buffer")]
    RequestTooLarge,
}

impl ProxyError {
    /// The HTTP status this error should be reported to the client as,
    /// if any. Errors with no client-visible status (connect/IO failures)
    /// are logged and the connection is simply closed.
    pub fn client_status(&self) -> Option<(u16, &'static str)> {
        match self {
            ProxyError::Parse(_) => Some((400, "Bad Request")),
            ProxyError::UnsupportedVersion(_) => Some((400, "Bad Request")),
            ProxyError::UnsupportedMethod(_) => Some((501, "Not Implemented")),
            ProxyError::UnsupportedScheme(_) => Some((501, "Not Implemented")),
            ProxyError::Connect(_) | ProxyError::Io(_) | ProxyError::RequestTooLarge => None,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ProxyError>;
