//! Request-URL reconstruction (`spec.md` §4.D).
//!
//! Endpoints that echo the request back to the caller (`/get`, `/anything`,
//! ...) need the URL the client believes it requested, which the server
//! only ever sees in pieces: the request URL's own host if the request
//! line carried one, else the `Host` header; `X-Forwarded-Proto`, then
//! `X-Forwarded-Protocol`, then `X-Forwarded-Ssl: on`, else plain `http`.
//! This is deliberately independent of `Options::hostname` -- that field
//! configures the unrelated `/hostname` endpoint, not URL reconstruction.

use crate::http::Request;

pub fn reconstruct_url(req: &Request) -> String {
    let scheme = if let Some(proto) = req.header("x-forwarded-proto") {
        proto.to_string()
    } else if let Some(proto) = req.header("x-forwarded-protocol") {
        proto.to_string()
    } else if req.header("x-forwarded-ssl") == Some("on") {
        "https".to_string()
    } else {
        "http".to_string()
    };

    let host = req.header("host").unwrap_or("").to_string();

    let query = if req.query.is_empty() {
        String::new()
    } else {
        let mut pairs: Vec<(String, String)> = req
            .query
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.clone(), v.clone())))
            .collect();
        pairs.sort();
        let encoded: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    url::form_urlencoded::byte_serialize(k.as_bytes()).collect::<String>(),
                    url::form_urlencoded::byte_serialize(v.as_bytes()).collect::<String>()
                )
            })
            .collect();
        format!("?{}", encoded.join("&"))
    };

    format!("{scheme}://{host}{}{query}", req.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_forwarded_proto_over_host_header_scheme() {
        let req = Request::parse(
            b"GET /get?a=1 HTTP/1.1\r\nHost: example.com\r\nX-Forwarded-Proto: https\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        assert_eq!(reconstruct_url(&req), "https://example.com/get?a=1");
    }

    #[test]
    fn falls_back_to_host_header_and_http() {
        let req = Request::parse(b"GET /get HTTP/1.1\r\nHost: example.com\r\n\r\n", Vec::new())
            .unwrap();
        assert_eq!(reconstruct_url(&req), "http://example.com/get");
    }

    #[test]
    fn x_forwarded_ssl_on_implies_https() {
        let req = Request::parse(
            b"GET /get HTTP/1.1\r\nHost: example.com\r\nX-Forwarded-Ssl: on\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        assert_eq!(reconstruct_url(&req), "https://example.com/get");
    }
}
