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

//! A minimal HTTP/1.x request-line and header parser.
//!
//! The parsed request owns every string it hands back (no borrowed
//! parser state to keep alive, unlike the C original this contract is
//! modeled on) and is dropped like any other value at the end of the
//! worker's scope.

use crate::error::{ProxyError, Result};

pub const MAX_LINE_LEN: usize = 4096;
const DEFAULT_HTTP_PORT: u16 = 80;

/// A fully parsed HTTP request: the request line plus every header the
/// client sent, in the order they arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    /// The request-target exactly as it appeared on the request line.
    pub uri: String,
    /// "1.0" or "1.1" — never anything else, `parse` rejects the rest.
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl ParsedRequest {
    /// Parses a request line and the header block that follows it (no
    /// trailing blank line expected — callers read headers until a blank
    /// line and pass only the header lines here).
    pub fn parse(request_line: &str, header_lines: &[String]) -> Result<Self> {
        if request_line.len() > MAX_LINE_LEN {
            return Err(ProxyError::Parse("request line too long".into()));
        }

        let mut parts = request_line.split_whitespace();
        let (method, uri, version_token) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(u), Some(v), None) => (m, u, v),
            _ => return Err(ProxyError::Parse(format!("malformed request line: {request_line:?}"))),
        };

        let version = parse_version_token(version_token)?;
        let (scheme, host, port, path) = parse_request_target(uri)?;

        let mut headers = Vec::with_capacity(header_lines.len());
        for line in header_lines {
            headers.push(parse_header_line(line)?);
        }

        Ok(ParsedRequest {
            method: method.to_string(),
            scheme,
            host,
            port,
            path,
            uri: uri.to_string(),
            version,
            headers,
        })
    }

    /// Case-sensitive header lookup, matching the source's literal
    /// string-compare contract (see the design notes on header overrides).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Splits a version token of the form `HTTP/1.0` or `HTTP/1.1` into its
/// numeric suffix. A token that isn't `HTTP/<digits>.<digits>` at all is
/// a parse failure; one that is well-formed but not 1.0/1.1 is a
/// supported-syntax-unsupported-value error (400, per spec, not 501).
fn parse_version_token(token: &str) -> Result<String> {
    let suffix = token
        .strip_prefix("HTTP/")
        .ok_or_else(|| ProxyError::Parse(format!("malformed http version: {token:?}")))?;
    let mut fields = suffix.splitn(2, '.');
    let (major, minor) = match (fields.next(), fields.next()) {
        (Some(maj), Some(min)) if !maj.is_empty() && !min.is_empty() => (maj, min),
        _ => return Err(ProxyError::Parse(format!("malformed http version: {token:?}"))),
    };
    if major.chars().any(|c| !c.is_ascii_digit()) || minor.chars().any(|c| !c.is_ascii_digit()) {
        return Err(ProxyError::Parse(format!("malformed http version: {token:?}")));
    }
    match suffix {
        "1.0" | "1.1" => Ok(suffix.to_string()),
        _ => Err(ProxyError::UnsupportedVersion(suffix.to_string())),
    }
}

/// Splits a request-target into scheme, host, port, and path. Accepts
/// the absolute-form URI a forward proxy receives (`http://host[:port]
/// /path`); defaults the port to 80 when omitted.
fn parse_request_target(uri: &str) -> Result<(String, String, u16, String)> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| ProxyError::Parse(format!("request target is not an absolute URI: {uri:?}")))?;

    if scheme != "http" {
        return Err(ProxyError::UnsupportedScheme(scheme.to_string()));
    }

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return Err(ProxyError::Parse(format!("missing host in request target: {uri:?}")));
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| ProxyError::Parse(format!("invalid port: {port_str:?}")))?;
            (host.to_string(), port)
        }
        None => (authority.to_string(), DEFAULT_HTTP_PORT),
    };

    Ok((scheme.to_string(), host, port, path.to_string()))
}

/// Parses a single `Name: value` header line, trimming the optional
/// leading space after the colon per RFC 7230 §3.2.
fn parse_header_line(line: &str) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| ProxyError::Parse(format!("malformed header line: {line:?}")))?;
    if name.is_empty() {
        return Err(ProxyError::Parse(format!("malformed header line: {line:?}")));
    }
    Ok((name.trim().to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parses_absolute_uri_with_explicit_port() {
        let req = ParsedRequest::parse(
            "GET http://h:80/a HTTP/1.1",
            &["Host: h".to_string()],
        )
        .unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.scheme, "http");
        assert_eq!(req.host, "h");
        assert_eq!(req.port, 80);
        assert_eq!(req.path, "/a");
        assert_eq!(req.version, "1.1");
        assert_eq!(req.header("Host"), Some("h"));
    }

    #[test_log::test]
    fn defaults_to_port_80_when_omitted() {
        let req = ParsedRequest::parse("GET http://example.com/ HTTP/1.0", &[]).unwrap();
        assert_eq!(req.host, "example.com");
        assert_eq!(req.port, 80);
        assert_eq!(req.path, "/");
    }

    #[test_log::test]
    fn path_defaults_to_root_when_absent() {
        let req = ParsedRequest::parse("GET http://example.com HTTP/1.0", &[]).unwrap();
        assert_eq!(req.path, "/");
    }

    #[test_log::test]
    fn rejects_malformed_request_line() {
        let err = ParsedRequest::parse("GET", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::Parse(_)));
    }

    #[test_log::test]
    fn rejects_malformed_version_syntax() {
        let err = ParsedRequest::parse("GET http://h/ WEIRD", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::Parse(_)));
    }

    #[test_log::test]
    fn rejects_unsupported_version_value() {
        let err = ParsedRequest::parse("GET http://h/ HTTP/2.0", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test_log::test]
    fn rejects_non_http_scheme() {
        let err = ParsedRequest::parse("GET ftp://h/ HTTP/1.0", &[]).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test_log::test]
    fn header_lookup_is_case_sensitive() {
        let req = ParsedRequest::parse(
            "GET http://h/ HTTP/1.0",
            &["host: h".to_string()],
        )
        .unwrap();
        assert_eq!(req.header("host"), Some("h"));
        assert_eq!(req.header("Host"), None);
    }

    #[test_log::test]
    fn preserves_header_order_and_duplicates() {
        let req = ParsedRequest::parse(
            "GET http://h/ HTTP/1.1",
            &["Host: h".to_string(), "X-A: 1".to_string(), "X-A: 2".to_string()],
        )
        .unwrap();
        assert_eq!(
            req.headers,
            vec![
                ("Host".to_string(), "h".to_string()),
                ("X-A".to_string(), "1".to_string()),
                ("X-A".to_string(), "2".to_string()),
            ]
        );
    }
}
