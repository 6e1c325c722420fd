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

//! Builds the outbound, always-HTTP/1.0 request sent to the origin.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProxyError, Result};
use crate::parser::ParsedRequest;

/// The outbound buffer budget. The source bounds its rewritten request to
/// a fixed-size stack buffer; 8 KiB comfortably holds any realistic
/// header set without imposing a hard limit on this module's own logic.
const MAX_REQUEST_LEN: usize = 8 * 1024;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:3.10.0) Gecko/20220411 Firefox/63.0.1";

/// Headers the proxy strips from the client's request and re-emits with a
/// fixed value of its own. Compared case-sensitively against the client's
/// header names — preserved from the source, not "fixed" to be
/// case-insensitive (see the design notes).
const OVERRIDE_HEADERS: &[&str] = &["Connection", "Proxy-Connection", "User-Agent"];

/// Builds the request line + header block to send to the origin:
/// `GET <uri> HTTP/1.0`, the client's other headers passed through
/// verbatim and in order, a synthesized `Host` only if the client didn't
/// supply one, and the three fixed override headers.
///
/// Fails with [`ProxyError::RequestTooLarge`] rather than emit a partial
/// request if the result would not fit in the outbound buffer budget.
pub fn rewrite(req: &ParsedRequest) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(512);

    out.put_slice(b"GET ");
    out.put_slice(req.uri.as_bytes());
    out.put_slice(b" HTTP/1.0\r\n");

    for (name, value) in &req.headers {
        if OVERRIDE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }

    if req.header("Host").is_none() {
        out.put_slice(format!("Host: {}:{}\r\n", req.host, req.port).as_bytes());
    }

    out.put_slice(b"Connection: close\r\n");
    out.put_slice(b"Proxy-Connection: close\r\n");
    out.put_slice(format!("User-Agent: {USER_AGENT}\r\n").as_bytes());
    out.put_slice(b"\r\n");

    if out.len() > MAX_REQUEST_LEN {
        return Err(ProxyError::RequestTooLarge);
    }

    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str, headers: &[&str]) -> ParsedRequest {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        ParsedRequest::parse(line, &headers).unwrap()
    }

    #[test_log::test]
    fn always_emits_http_1_0_regardless_of_client_version() {
        let req = parse("GET http://h:80/a HTTP/1.1", &["Host: h"]);
        let out = rewrite(&req).unwrap();
        assert!(out.starts_with(b"GET http://h:80/a HTTP/1.0\r\n"));
    }

    #[test_log::test]
    fn emits_fixed_overrides_exactly_once_regardless_of_client_supplied_values() {
        let req = parse(
            "GET http://h:80/a HTTP/1.1",
            &[
                "Host: h",
                "Connection: keep-alive",
                "Proxy-Connection: keep-alive",
                "User-Agent: curl/8.0",
            ],
        );
        let out = rewrite(&req).unwrap();
        let text = String::from_utf8(out.to_vec()).unwrap();

        assert_eq!(text.matches("Connection: close").count(), 1);
        assert_eq!(text.matches("Proxy-Connection: close").count(), 1);
        assert_eq!(text.matches(&format!("User-Agent: {USER_AGENT}")).count(), 1);
        assert!(!text.contains("keep-alive"));
        assert!(!text.contains("curl/8.0"));
    }

    #[test_log::test]
    fn keeps_client_supplied_host_verbatim_and_does_not_synthesize_one() {
        let req = parse("GET http://h:80/a HTTP/1.0", &["Host: custom-host:9999"]);
        let out = rewrite(&req).unwrap();
        let text = String::from_utf8(out.to_vec()).unwrap();
        assert_eq!(text.matches("Host:").count(), 1);
        assert!(text.contains("Host: custom-host:9999"));
    }

    #[test_log::test]
    fn synthesizes_host_when_client_omits_it() {
        let req = parse("GET http://h:8080/a HTTP/1.0", &[]);
        let out = rewrite(&req).unwrap();
        let text = String::from_utf8(out.to_vec()).unwrap();
        assert!(text.contains("Host: h:8080\r\n"));
    }

    #[test_log::test]
    fn passes_through_other_headers_in_order_including_duplicates() {
        let req = parse(
            "GET http://h/a HTTP/1.0",
            &["Host: h", "X-A: 1", "X-A: 2", "Accept: */*"],
        );
        let out = rewrite(&req).unwrap();
        let text = String::from_utf8(out.to_vec()).unwrap();
        let a_pos = text.find("X-A: 1").unwrap();
        let b_pos = text.find("X-A: 2").unwrap();
        let accept_pos = text.find("Accept: */*").unwrap();
        assert!(a_pos < b_pos);
        assert!(b_pos < accept_pos);
    }

    #[test_log::test]
    fn ends_with_blank_line() {
        let req = parse("GET http://h/a HTTP/1.0", &["Host: h"]);
        let out = rewrite(&req).unwrap();
        assert!(out.ends_with(b"\r\n\r\n"));
    }

    #[test_log::test]
    fn round_trips_through_the_parser() {
        let req = parse("GET http://h:80/a HTTP/1.1", &["Host: h"]);
        let out = rewrite(&req).unwrap();
        let text = String::from_utf8(out.to_vec()).unwrap();

        let mut lines = text.split("\r\n");
        let request_line = lines.next().unwrap();
        let headers: Vec<String> = lines.filter(|l| !l.is_empty()).map(|s| s.to_string()).collect();

        let reparsed = ParsedRequest::parse(request_line, &headers).unwrap();
        assert_eq!(reparsed.method, "GET");
        assert_eq!(reparsed.uri, "http://h:80/a");
        assert_eq!(reparsed.version, "1.0");
        assert_eq!(reparsed.header("Connection"), Some("close"));
        assert_eq!(reparsed.header("Proxy-Connection"), Some("close"));
        assert_eq!(reparsed.header("User-Agent"), Some(USER_AGENT));
    }
}
