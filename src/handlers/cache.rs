//! Cache-control endpoints: `/cache`, `/cache/<n>`, `/etag/<etag>`
//! (`spec.md` §4.F).

use crate::config::Options;
use crate::error::Error;
use crate::handlers::reflection;
use crate::http::response::http_date_now;
use crate::http::{Request, Response};
use serde_json::json;
use sha1::{Digest, Sha1};
use std::net::SocketAddr;

/// `/cache`: 304s if the client already sent a matching `If-Modified-Since`
/// or `If-None-Match`; otherwise returns the reflection body stamped with
/// fresh cache validators.
pub async fn cache(req: &Request, peer: SocketAddr, options: &Options) -> Result<Response, Error> {
    if req.header("if-modified-since").is_some() || req.header("if-none-match").is_some() {
        return Ok(Response::new(304));
    }

    let body = reflection::reflection_body(req, peer, options).await?.to_string();
    let etag = format!("\"{}\"", hex_digest(body.as_bytes()));
    Ok(Response::new(200)
        .header("Content-Type", "application/json")
        .header("ETag", etag)
        .header("Last-Modified", http_date_now())
        .with_body(body.into_bytes()))
}

/// `/cache/<n>`: sets `Cache-Control: public, max-age=<n>`.
pub async fn cache_for(req: &Request) -> Result<Response, Error> {
    let spec = req
        .path
        .strip_prefix("/cache/")
        .ok_or_else(|| Error::InvalidPathParameter("missing cache duration".into()))?;
    let seconds: u64 = spec
        .parse()
        .map_err(|_| Error::InvalidPathParameter(format!("invalid cache duration: {spec}")))?;

    Ok(Response::new(200)
        .header("Cache-Control", format!("public, max-age={seconds}"))
        .with_body(json!({"cached_seconds": seconds}).to_string().into_bytes())
        .header("Content-Type", "application/json"))
}

/// `/etag/<etag>`: round-trips the given ETag and honors conditional
/// requests against it via `If-None-Match`/`If-Match`.
pub async fn etag(req: &Request) -> Result<Response, Error> {
    let requested = req
        .path
        .strip_prefix("/etag/")
        .ok_or_else(|| Error::InvalidPathParameter("missing etag".into()))?;
    let quoted = format!("\"{requested}\"");

    if let Some(if_none_match) = req.header("if-none-match") {
        if if_none_match == quoted || if_none_match == "*" {
            return Ok(Response::new(304).header("ETag", quoted));
        }
    }
    if let Some(if_match) = req.header("if-match") {
        if if_match != quoted && if_match != "*" {
            return Ok(Response::new(412));
        }
    }

    Ok(Response::new(200)
        .header("ETag", quoted)
        .with_body(json!({"etag": requested}).to_string().into_bytes())
        .header("Content-Type", "application/json"))
}

fn hex_digest(data: &[u8]) -> String {
    let digest = Sha1::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[tokio::test]
    async fn cache_returns_304_when_already_validated() {
        let req = Request::parse(
            b"GET /cache HTTP/1.1\r\nIf-None-Match: \"x\"\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let response = cache(&req, peer(), &Options::default()).await.unwrap();
        assert_eq!(response.status, 304);
    }

    #[tokio::test]
    async fn cache_returns_a_full_reflection_record() {
        let req = Request::parse(b"GET /cache HTTP/1.1\r\nHost: example.com\r\n\r\n", Vec::new())
            .unwrap();
        let response = cache(&req, peer(), &Options::default()).await.unwrap();
        assert_eq!(response.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["method"], "GET");
        assert!(body.get("headers").is_some());
    }

    #[tokio::test]
    async fn etag_matches_returns_304() {
        let req = Request::parse(
            b"GET /etag/abc HTTP/1.1\r\nIf-None-Match: \"abc\"\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let response = etag(&req).await.unwrap();
        assert_eq!(response.status, 304);
    }

    #[tokio::test]
    async fn etag_mismatch_on_if_match_returns_412() {
        let req = Request::parse(
            b"GET /etag/abc HTTP/1.1\r\nIf-Match: \"zzz\"\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let response = etag(&req).await.unwrap();
        assert_eq!(response.status, 412);
    }
}
