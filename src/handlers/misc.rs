//! Miscellaneous one-off endpoints: `/uuid`, `/base64/<value>`, `/headers`,
//! `/ip`, `/user-agent`, `/`, `/forms/post`, `/encoding/utf8`,
//! `/robots.txt`, `/deny` (`spec.md` §4.F).
//!
//! The templated HTML pages are opaque blobs per `spec.md`'s Non-goals;
//! only the `{{prefix}}` placeholder is substituted, matching the
//! teacher's general style of doing the minimum string work needed and no
//! more.

use crate::config::Options;
use crate::error::Error;
use crate::helpers::{ip, wildcard};
use crate::http::{Request, Response};
use base64::prelude::*;
use serde_json::json;
use std::net::SocketAddr;
use uuid::Uuid;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");
const FORMS_POST_TEMPLATE: &str = include_str!("../../templates/forms_post.html");
const UTF8_TEMPLATE: &str = include_str!("../../templates/utf8.html");

fn render(template: &str, options: &Options) -> String {
    template.replace("{{prefix}}", &options.prefix)
}

pub async fn index(options: &Options) -> Result<Response, Error> {
    Ok(Response::html(200, render(INDEX_TEMPLATE, options)))
}

pub async fn forms_post(options: &Options) -> Result<Response, Error> {
    Ok(Response::html(200, render(FORMS_POST_TEMPLATE, options)))
}

pub async fn encoding_utf8(options: &Options) -> Result<Response, Error> {
    Ok(Response::html(200, render(UTF8_TEMPLATE, options)))
}

pub async fn uuid() -> Result<Response, Error> {
    Ok(Response::json(200, &json!({"uuid": Uuid::new_v4().to_string()})))
}

/// `/base64/<value>`: decodes standard base64 by default, or encodes with
/// `?encode=true`.
pub async fn base64(req: &Request) -> Result<Response, Error> {
    let value = req
        .path
        .strip_prefix("/base64/")
        .ok_or_else(|| Error::InvalidPathParameter("missing base64 value".into()))?;

    let encode = req.query_param("encode") == Some("true");
    if encode {
        Ok(Response::text(200, BASE64_STANDARD.encode(value)))
    } else {
        let decoded = BASE64_STANDARD
            .decode(value)
            .map_err(|_| Error::BadRequest(format!("invalid base64 value: {value}")))?;
        Ok(Response::text(200, String::from_utf8_lossy(&decoded).into_owned()))
    }
}

pub async fn headers(req: &Request, options: &Options) -> Result<Response, Error> {
    let headers: serde_json::Map<String, serde_json::Value> = req
        .headers()
        .iter()
        .filter(|(name, _)| !wildcard::matches_any(&options.exclude_headers, name))
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect();
    Ok(Response::json(200, &json!({"headers": headers})))
}

pub async fn ip_addr(req: &Request, peer: SocketAddr) -> Result<Response, Error> {
    Ok(Response::json(200, &json!({"origin": ip::client_ip(req, peer)})))
}

pub async fn user_agent(req: &Request) -> Result<Response, Error> {
    Ok(Response::json(
        200,
        &json!({"user-agent": req.header("user-agent").unwrap_or("")}),
    ))
}

pub async fn robots_txt() -> Result<Response, Error> {
    Ok(Response::text(200, "User-agent: *\nDisallow: /deny\n"))
}

pub async fn deny() -> Result<Response, Error> {
    Ok(Response::text(
        200,
        "YOU SHOULDN'T BE HERE\n",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uuid_returns_a_v4_uuid() {
        let response = uuid().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        let parsed = Uuid::parse_str(body["uuid"].as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[tokio::test]
    async fn base64_decodes_by_default() {
        let req = Request::parse(b"GET /base64/aGVsbG8= HTTP/1.1\r\n\r\n", Vec::new()).unwrap();
        let response = base64(&req).await.unwrap();
        assert_eq!(response.body, b"hello".as_slice());
    }

    #[tokio::test]
    async fn base64_encodes_when_requested() {
        let req = Request::parse(b"GET /base64/hello?encode=true HTTP/1.1\r\n\r\n", Vec::new())
            .unwrap();
        let response = base64(&req).await.unwrap();
        assert_eq!(response.body, BASE64_STANDARD.encode("hello").as_bytes());
    }

    #[tokio::test]
    async fn index_substitutes_prefix() {
        let options = Options {
            prefix: "/mirror".into(),
            ..Options::default()
        };
        let response = index(&options).await.unwrap();
        let body = String::from_utf8(response.body.to_vec()).unwrap();
        assert!(body.contains("/mirror"));
        assert!(!body.contains("{{prefix}}"));
    }
}
