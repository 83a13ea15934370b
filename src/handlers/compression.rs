//! `/gzip` and `/deflate` (`spec.md` §4.F).
//!
//! Compresses the same reflection JSON tree `handlers::reflection::reflect`
//! produces, then sends it back with the matching `Content-Encoding`.
//! `flate2` is already part of the teacher's dependency tree
//! (`socket-flow::compression`, used there for the permessage-deflate
//! WebSocket extension); reused here for plain HTTP body compression
//! instead.

use crate::config::Options;
use crate::error::Error;
use crate::http::{Request, Response};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::net::SocketAddr;

use super::reflection::reflect;

pub async fn gzip(req: &Request, peer: SocketAddr, options: &Options) -> Result<Response, Error> {
    let inner = reflect(req, peer, options).await?;
    let mut body: serde_json::Value = serde_json::from_slice(&inner.body).unwrap_or(json!({}));
    body["gzipped"] = json!(true);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&serde_json::to_vec(&body).unwrap_or_default())
        .map_err(|e| Error::Io { source: e })?;
    let compressed = encoder.finish().map_err(|e| Error::Io { source: e })?;

    Ok(Response::new(200)
        .header("Content-Type", "application/json")
        .header("Content-Encoding", "gzip")
        .with_body(compressed))
}

pub async fn deflate(req: &Request, peer: SocketAddr, options: &Options) -> Result<Response, Error> {
    let inner = reflect(req, peer, options).await?;
    let mut body: serde_json::Value = serde_json::from_slice(&inner.body).unwrap_or(json!({}));
    body["deflated"] = json!(true);

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&serde_json::to_vec(&body).unwrap_or_default())
        .map_err(|e| Error::Io { source: e })?;
    let compressed = encoder.finish().map_err(|e| Error::Io { source: e })?;

    Ok(Response::new(200)
        .header("Content-Type", "application/json")
        .header("Content-Encoding", "deflate")
        .with_body(compressed))
}
