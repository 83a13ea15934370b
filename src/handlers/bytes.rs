//! `/bytes/<n>` and `/stream-bytes/<n>` (`spec.md` §4.F).
//!
//! `stream_bytes` writes directly to the socket in `Transfer-Encoding:
//! chunked` framing, the same split `handlers::streaming` draws between a
//! buffered `Response` and a connection the handler takes over itself --
//! going through the buffered `Response` here would mean RFC 7230 forbids
//! the `Content-Length` it unconditionally appends alongside the chunked
//! framing.

use crate::error::Error;
use crate::helpers::bytestream::ByteStream;
use crate::http::{Request, Response};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK_SIZE: usize = 8192;

fn n_param(req: &Request, prefix: &str) -> Result<u64, Error> {
    let spec = req
        .path
        .strip_prefix(prefix)
        .ok_or_else(|| Error::InvalidPathParameter("missing byte count".into()))?;
    spec.parse()
        .map_err(|_| Error::InvalidPathParameter(format!("invalid byte count: {spec}")))
}

fn seed_param(req: &Request) -> u64 {
    req.query_param("seed").and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Buffers the full synthetic body and returns it in one response.
pub async fn bytes(req: &Request) -> Result<Response, Error> {
    let n = n_param(req, "/bytes/")?;
    let mut stream = ByteStream::new(seed_param(req), n);
    let mut buf = Vec::with_capacity(n as usize);
    stream.read_to_end(&mut buf).await?;
    Ok(Response::new(200)
        .header("Content-Type", "application/octet-stream")
        .with_body(buf))
}

/// Identical bytes, but written straight to `writer` in fixed-size chunks
/// so a client observes data arriving incrementally rather than all at
/// once.
pub async fn stream_bytes<W: AsyncWrite + Unpin>(writer: &mut W, req: &Request) -> Result<(), Error> {
    let n = n_param(req, "/stream-bytes/")?;
    let mut stream = ByteStream::new(seed_param(req), n);

    let header = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nTransfer-Encoding: chunked\r\n\r\n";
    writer.write_all(header.as_bytes()).await?;

    let mut remaining = n as usize;
    let mut buf = vec![0u8; CHUNK_SIZE];
    while remaining > 0 {
        let take = remaining.min(CHUNK_SIZE);
        let read = stream.read(&mut buf[..take]).await?;
        if read == 0 {
            break;
        }
        write_chunk(writer, &buf[..read]).await?;
        remaining -= read;
    }
    write_chunk(writer, b"").await
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), Error> {
    writer
        .write_all(format!("{:x}\r\n", data.len()).as_bytes())
        .await?;
    writer.write_all(data).await?;
    writer.write_all(b"\r\n").await?;
    Ok(())
}
