//! Request-reflection endpoints: `/get`, `/post`, `/put`, `/patch`,
//! `/delete`, `/anything` (`spec.md` §4.F).
//!
//! Every one of these endpoints builds the same JSON tree; only the set of
//! methods a given path accepts differs (`/get` is `GET`-only, `/anything`
//! takes any method), so they all funnel through `reflect`.

use crate::config::Options;
use crate::error::Error;
use crate::helpers::{body, ip, url, wildcard};
use crate::http::{Request, Response};
use serde_json::json;
use std::net::SocketAddr;

/// Builds the reflection-record JSON tree shared by every endpoint that
/// echoes the request back to the caller -- `/get`, `/post`, `/anything`,
/// the streaming variants (`/stream`, `/delay`), and `/cache`.
pub async fn reflection_body(
    req: &Request,
    peer: SocketAddr,
    options: &Options,
) -> Result<serde_json::Value, Error> {
    let parsed = body::parse_body(&req.method, req.header("content-type"), req.body.clone()).await?;
    let (form, files) = body::body_to_json(&parsed);

    let mut header_names: Vec<&str> = req
        .headers()
        .iter()
        .map(|(name, _)| name.as_str())
        .collect();
    header_names.sort_unstable();
    header_names.dedup();

    let headers: serde_json::Map<String, serde_json::Value> = header_names
        .into_iter()
        .filter(|name| !wildcard::matches_any(&options.exclude_headers, name))
        .map(|name| (name.to_string(), json!(req.header_all(name))))
        .collect();

    let args: serde_json::Map<String, serde_json::Value> = req
        .query
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();

    let data = if parsed.json.is_some() {
        String::new()
    } else {
        String::from_utf8_lossy(&parsed.data).into_owned()
    };

    Ok(json!({
        "method": req.method,
        "url": url::reconstruct_url(req),
        "origin": ip::client_ip(req, peer),
        "headers": headers,
        "args": args,
        "form": form,
        "files": files,
        "json": parsed.json,
        "data": data,
    }))
}

pub async fn reflect(req: &Request, peer: SocketAddr, options: &Options) -> Result<Response, Error> {
    let body = reflection_body(req, peer, options).await?;
    Ok(Response::json(200, &body))
}

/// `/hostname`: reports the configured hostname, or a fixed placeholder if
/// none was pinned via `Options::hostname`/`USE_REAL_HOSTNAME`.
pub async fn hostname(options: &Options) -> Result<Response, Error> {
    let name = if options.hostname.is_empty() {
        "httpmirror"
    } else {
        options.hostname.as_str()
    };
    Ok(Response::json(200, &json!({"hostname": name})))
}

/// `/dump/request`: renders the raw request line, headers, and body back as
/// plain text rather than the structured JSON tree `reflect` builds.
pub async fn dump_request(req: &Request) -> Result<Response, Error> {
    let mut out = format!("{} {} HTTP/1.{}\n", req.method, req.path, req.version);
    for (name, value) in req.headers() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(&req.body));
    Ok(Response::new(200)
        .header("Content-Type", "text/plain; charset=utf-8")
        .with_body(out.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    #[tokio::test]
    async fn reflects_query_args_and_headers() {
        let req = Request::parse(
            b"GET /get?a=1 HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let options = Options::default();
        let response = reflect(&req, peer, &options).await.unwrap();
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["args"]["a"], json!(["1"]));
        assert_eq!(body["headers"]["host"], json!(["example.com"]));
        assert_eq!(body["method"], "GET");
    }

    #[tokio::test]
    async fn reflects_duplicate_query_keys_as_an_ordered_list() {
        let req = Request::parse(b"GET /get?a=1&a=2 HTTP/1.1\r\n\r\n", Vec::new()).unwrap();
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let options = Options::default();
        let response = reflect(&req, peer, &options).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["args"]["a"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn excluded_headers_are_dropped() {
        let req = Request::parse(
            b"GET /get HTTP/1.1\r\nAuthorization: secret\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let peer: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let options = Options {
            exclude_headers: vec!["authorization".to_string()],
            ..Options::default()
        };
        let response = reflect(&req, peer, &options).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert!(body["headers"].get("authorization").is_none());
    }

    #[tokio::test]
    async fn hostname_falls_back_to_placeholder_when_unset() {
        let response = hostname(&Options::default()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["hostname"], "httpmirror");
    }

    #[tokio::test]
    async fn dump_request_renders_request_line_and_body() {
        let req = Request::parse(b"POST /dump/request HTTP/1.1\r\nHost: x\r\n\r\n", b"hi".to_vec())
            .unwrap();
        let response = dump_request(&req).await.unwrap();
        let text = String::from_utf8(response.body.to_vec()).unwrap();
        assert!(text.starts_with("POST /dump/request HTTP/1.1\n"));
        assert!(text.ends_with("hi"));
    }
}
