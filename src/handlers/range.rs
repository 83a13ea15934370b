//! `/range/<n>` (`spec.md` §4.F, RFC 7233 range requests).

use crate::error::Error;
use crate::helpers::bytestream::ByteStream;
use crate::http::{Request, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

struct ByteRange {
    start: u64,
    end: u64,
}

/// A `Range` header that parsed but can't be satisfied against `total`
/// bytes -- distinct from a malformed header, since RFC 7233 wants 416 for
/// the former and leaves the latter to plain 400.
struct Unsatisfiable;

const MULTIPART_BOUNDARY: &str = "3d6b6a416f9b5";

/// Parses one `start-end` (or `-suffix`) range spec against `total`.
fn parse_one_range(spec: &str, total: u64) -> Result<Result<ByteRange, Unsatisfiable>, Error> {
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| Error::BadRequest(format!("malformed Range spec: {spec}")))?;

    let (start, end) = if start.is_empty() {
        let suffix: u64 = end
            .parse()
            .map_err(|_| Error::BadRequest("malformed Range suffix".into()))?;
        (total.saturating_sub(suffix), total.saturating_sub(1))
    } else {
        let start: u64 = start
            .parse()
            .map_err(|_| Error::BadRequest("malformed Range start".into()))?;
        let end: u64 = if end.is_empty() {
            total.saturating_sub(1)
        } else {
            end.parse()
                .map_err(|_| Error::BadRequest("malformed Range end".into()))?
        };
        (start, end)
    };

    if start > end || end >= total {
        return Ok(Err(Unsatisfiable));
    }

    Ok(Ok(ByteRange { start, end }))
}

/// Parses a `Range: bytes=spec[,spec...]` header into one or more byte
/// ranges. The whole header is unsatisfiable (416) only if every spec in it
/// is; specs that parse but fall outside `total` are dropped individually,
/// per RFC 7233 §2.1.
fn parse_range(header: &str, total: u64) -> Result<Result<Vec<ByteRange>, Unsatisfiable>, Error> {
    let specs = header
        .strip_prefix("bytes=")
        .ok_or_else(|| Error::BadRequest(format!("unsupported Range unit: {header}")))?;

    let mut ranges = Vec::new();
    for spec in specs.split(',') {
        if let Ok(range) = parse_one_range(spec.trim(), total)? {
            ranges.push(range);
        }
    }

    if ranges.is_empty() {
        Ok(Err(Unsatisfiable))
    } else {
        Ok(Ok(ranges))
    }
}

/// `If-Range` against the stream's synthetic, seed-derived ETag: a mismatch
/// means the client's cached representation is stale, so the request is
/// served in full rather than as a range.
fn if_range_matches(req: &Request, etag: &str) -> bool {
    match req.header("if-range") {
        Some(value) => value == etag,
        None => true,
    }
}

pub async fn range(req: &Request) -> Result<Response, Error> {
    let spec = req
        .path
        .strip_prefix("/range/")
        .ok_or_else(|| Error::InvalidPathParameter("missing range size".into()))?;
    let total: u64 = spec
        .parse()
        .map_err(|_| Error::InvalidPathParameter(format!("invalid range size: {spec}")))?;

    let seed: u64 = req.query_param("seed").and_then(|v| v.parse().ok()).unwrap_or(0);
    let etag = format!("\"range-{seed}-{total}\"");
    let mut stream = ByteStream::new(seed, total);

    match req.header("range") {
        Some(header) if if_range_matches(req, &etag) => match parse_range(header, total)? {
            Ok(ranges) if ranges.len() == 1 => {
                let byte_range = &ranges[0];
                let len = byte_range.end - byte_range.start + 1;
                stream
                    .seek(std::io::SeekFrom::Start(byte_range.start))
                    .await?;
                let mut buf = vec![0u8; len as usize];
                stream.read_exact(&mut buf).await?;
                Ok(Response::new(206)
                    .header("Content-Type", "application/octet-stream")
                    .header("Accept-Ranges", "bytes")
                    .header("ETag", etag)
                    .header(
                        "Content-Range",
                        format!("bytes {}-{}/{total}", byte_range.start, byte_range.end),
                    )
                    .with_body(buf))
            }
            Ok(ranges) => {
                let mut body = Vec::new();
                for byte_range in &ranges {
                    let len = byte_range.end - byte_range.start + 1;
                    stream
                        .seek(std::io::SeekFrom::Start(byte_range.start))
                        .await?;
                    let mut part = vec![0u8; len as usize];
                    stream.read_exact(&mut part).await?;

                    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
                    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
                    body.extend_from_slice(
                        format!(
                            "Content-Range: bytes {}-{}/{total}\r\n\r\n",
                            byte_range.start, byte_range.end
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&part);
                    body.extend_from_slice(b"\r\n");
                }
                body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

                Ok(Response::new(206)
                    .header(
                        "Content-Type",
                        format!("multipart/byteranges; boundary={MULTIPART_BOUNDARY}"),
                    )
                    .header("Accept-Ranges", "bytes")
                    .header("ETag", etag)
                    .with_body(body))
            }
            Err(Unsatisfiable) => Ok(Response::new(416)
                .header("Content-Range", format!("bytes */{total}"))
                .header("Accept-Ranges", "bytes")),
        },
        _ => {
            let mut buf = Vec::with_capacity(total as usize);
            stream.read_to_end(&mut buf).await?;
            Ok(Response::new(200)
                .header("Content-Type", "application/octet-stream")
                .header("Accept-Ranges", "bytes")
                .header("ETag", etag)
                .with_body(buf))
        }
    }
}
