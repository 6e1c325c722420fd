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

//! Short-read/short-write-safe line and block I/O over a socket half.
//!
//! `tokio`'s buffered reader already loops internally to fill its buffer,
//! and `AsyncWriteExt::write_all` already loops until every byte is
//! written or an error occurs, so this module is a thin, typed layer over
//! those primitives rather than a from-scratch implementation — the
//! short-read/short-write discipline spec.md asks for is exactly what
//! `tokio::io` already guarantees.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{ProxyError, Result};
use crate::parser::MAX_LINE_LEN;

/// Wraps a readable half of a connection for line-oriented reads.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Reads one line, stripping the trailing `\r\n` or `\n`. Returns
    /// `Ok(None)` at EOF with nothing left to read (a clean connection
    /// close before the next request line), matching the external
    /// contract's "0 at EOF".
    ///
    /// Reads one byte at a time against `BufReader`'s own internal buffer
    /// (no extra syscall per byte) and checks the length bound on every
    /// byte, so a line with no terminator can never grow `buf` past
    /// `MAX_LINE_LEN` — the external contract's `read_line(fd, buf, n)` is
    /// a bounded read, not a read-then-reject.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.inner.read(&mut byte).await?;
            if n == 0 {
                if buf.is_empty() {
                    return Ok(None);
                }
                break;
            }
            if buf.len() >= MAX_LINE_LEN {
                return Err(ProxyError::Parse("line exceeds maximum length".into()));
            }
            buf.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        let line = String::from_utf8(buf).map_err(|_| ProxyError::Parse("line is not valid utf-8".into()))?;
        Ok(Some(line))
    }

    /// Reads header lines until a blank line (the end of the header
    /// block) or EOF.
    pub async fn read_headers(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            match self.read_line().await? {
                None => break,
                Some(line) if line.is_empty() => break,
                Some(line) => lines.push(line),
            }
        }
        Ok(lines)
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Writes `buf` in full, looping internally on short writes, surfacing
/// any error as fatal to the caller's exchange.
pub async fn write_all<W: AsyncWrite + Unpin>(writer: &mut W, buf: &[u8]) -> Result<()> {
    writer.write_all(buf).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn reads_request_line_and_headers_up_to_blank_line() {
        let raw = b"GET / HTTP/1.0\r\nHost: h\r\n\r\nbody-not-consumed".to_vec();
        let mut reader = LineReader::new(raw.as_slice());
        let request_line = reader.read_line().await.unwrap().unwrap();
        assert_eq!(request_line, "GET / HTTP/1.0");
        let headers = reader.read_headers().await.unwrap();
        assert_eq!(headers, vec!["Host: h".to_string()]);
    }

    #[test_log::test(tokio::test)]
    async fn read_line_returns_none_at_clean_eof() {
        let raw: Vec<u8> = vec![];
        let mut reader = LineReader::new(raw.as_slice());
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn read_line_rejects_an_unterminated_line_without_unbounded_growth() {
        // No `\n` anywhere in the input, well past MAX_LINE_LEN: the read
        // must fail once the bound is hit rather than buffering the whole
        // (here, never-ending) stream first.
        let raw = vec![b'a'; MAX_LINE_LEN * 4];
        let mut reader = LineReader::new(raw.as_slice());
        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, ProxyError::Parse(_)));
    }
}
