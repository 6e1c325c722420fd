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

//! The minimal HTML error page sent for any 4xx/5xx outcome.

use bytes::{BufMut, Bytes, BytesMut};

/// Builds a complete HTTP/1.0 response (status line, headers, and body)
/// for a client-visible error. `long` is the explanatory sentence shown
/// in the body; `code`/`short` become both the status line and the page
/// title.
pub fn render(code: u16, short: &str, long: &str) -> Bytes {
    let body = format!(
        "<!DOCTYPE html><html><head><title>Error</title></head>\n\
         <body bgcolor=\"ffffff\"><h1>{code}: {short}</h1><p>{long}</p>\n\
         <hr/><em>Proxy</em></body></html>"
    );

    let mut out = BytesMut::with_capacity(body.len() + 128);
    out.put_slice(format!("HTTP/1.0 {code} {short}\r\n").as_bytes());
    out.put_slice(b"Content-Type: text/html\r\n");
    out.put_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    out.put_slice(b"Connection: close\r\n");
    out.put_slice(b"\r\n");
    out.put_slice(body.as_bytes());
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn content_length_matches_actual_body_length() {
        let page = render(501, "Not Implemented", "Unsupported method.");
        let text = String::from_utf8(page.to_vec()).unwrap();
        let (headers, body) = text.split_once("\r\n\r\n").unwrap();
        let declared: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(declared, body.len());
    }

    #[test_log::test]
    fn status_line_matches_code_and_short() {
        let page = render(400, "Bad Request", "Malformed request.");
        assert!(page.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
    }
}
