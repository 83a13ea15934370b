//! Parsed HTTP request (component F support).
//!
//! Header parsing itself rides on `httparse`, already part of the
//! teacher's dependency stack (it parses its own handshake requests with
//! it in `socket-flow::request`); what's new here is turning the parsed
//! headers into the case-insensitive lookup and query-string access every
//! handler in this crate needs, which the teacher's code never required
//! since it only ever dials out as a client.

use crate::error::Error;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Query-argument mapping: name -> ordered list of values, duplicates
    /// preserved (`spec.md` §3) -- `GET /get?a=1&a=2` yields `{"a": ["1",
    /// "2"]}`, not a single overwritten value.
    pub query: HashMap<String, Vec<String>>,
    pub version: u8,
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Parses a complete request (headers fully buffered; `body` already
    /// split out by the caller using `Content-Length`/chunked framing).
    pub fn parse(head: &[u8], body: Vec<u8>) -> Result<Self, Error> {
        let mut header_buf = [httparse::EMPTY_HEADER; 64];
        let mut parsed = httparse::Request::new(&mut header_buf);

        let status = parsed
            .parse(head)
            .map_err(|e| Error::BadRequest(format!("malformed request: {e}")))?;
        if status.is_partial() {
            return Err(Error::BadRequest("incomplete request head".into()));
        }

        let method = parsed
            .method
            .ok_or_else(|| Error::BadRequest("missing HTTP method".into()))?
            .to_string();
        let raw_path = parsed
            .path
            .ok_or_else(|| Error::BadRequest("missing request target".into()))?;
        let version = parsed.version.unwrap_or(1);

        let (path, query) = split_target(raw_path);

        let headers = parsed
            .headers
            .iter()
            .map(|h| {
                (
                    h.name.to_ascii_lowercase(),
                    String::from_utf8_lossy(h.value).trim().to_string(),
                )
            })
            .collect();

        Ok(Self {
            method,
            path,
            query,
            version,
            headers,
            body,
        })
    }

    /// Case-insensitive header lookup. When a header repeats, returns the
    /// first occurrence; callers needing every value use `header_all`.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// The first value of a query parameter, for the common case where a
    /// handler only cares about one value even if the client repeated the
    /// key. Callers that must honor every repeated value use `query`
    /// directly.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

fn split_target(raw: &str) -> (String, HashMap<String, Vec<String>>) {
    match raw.split_once('?') {
        Some((path, query_string)) => (path.to_string(), parse_query_string(query_string)),
        None => (raw.to_string(), HashMap::new()),
    }
}

fn parse_query_string(query_string: &str) -> HashMap<String, Vec<String>> {
    let mut query: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()).into_owned() {
        query.entry(key).or_default().push(value);
    }
    query
}
