//! Default transport backed by libcurl (the `curl` crate).

use super::{Request, Response, Transport, TransportError};
use std::str;
use std::time::Duration;

/// Timeouts applied to every exchange.
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

/// POSTs each request with a fresh `Easy` handle.
///
/// Runs in the calling thread; the sender invokes it from `spawn_blocking`.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: TransportOptions,
}

impl CurlTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }
}

impl Transport for CurlTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut easy = ::curl::easy::Easy::new();
        easy.url(&request.endpoint)?;
        easy.post(true)?;
        easy.post_fields_copy(&request.body)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        easy.timeout(self.options.timeout)?;

        let mut list = ::curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        // Suppress curl's automatic "Expect: 100-continue" on larger bodies.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        let mut raw_headers: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    raw_headers.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().map_err(|e| {
                if e.is_operation_timedout() {
                    TransportError::Timeout(self.options.timeout)
                } else {
                    TransportError::Curl(e)
                }
            })?;
        }

        let status = easy.response_code()? as u16;
        Ok(Response {
            status,
            headers: parse_headers(&raw_headers),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Keeps `Name: value` lines from the final response only (redirects and
/// `100 Continue` produce earlier header blocks that start with a status line).
fn parse_headers(lines: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in lines {
        if line.starts_with("HTTP/") {
            out.clear();
            continue;
        }
        if let Some((k, v)) = line.split_once(':') {
            out.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_keeps_last_block() {
        let lines: Vec<String> = [
            "HTTP/1.1 100 Continue",
            "",
            "HTTP/1.1 429 Too Many Requests",
            "Retry-After: 7",
            "Content-Type: text/plain",
            "",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let h = parse_headers(&lines);
        assert_eq!(
            h,
            vec![
                ("Retry-After".to_string(), "7".to_string()),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ]
        );
    }

    #[test]
    fn connection_refused_is_transport_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let t = CurlTransport::new(TransportOptions {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(2),
        });
        let req = Request {
            endpoint: "http://127.0.0.1:9/".to_string(),
            headers: vec![],
            body: b"[]".to_vec(),
        };
        assert!(t.send(&req).is_err());
    }

    #[test]
    fn silent_server_times_out() {
        // Accepts the connection but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(3));
                drop(stream);
            }
        });
        let t = CurlTransport::new(TransportOptions {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_millis(300),
        });
        let req = Request {
            endpoint: format!("http://127.0.0.1:{port}/"),
            headers: vec![],
            body: b"[]".to_vec(),
        };
        match t.send(&req) {
            Err(TransportError::Timeout(d)) => assert_eq!(d, Duration::from_millis(300)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
