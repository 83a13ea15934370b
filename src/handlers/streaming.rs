//! `/stream/<n>`, `/delay/<n>`, `/drip`, `/sse` (`spec.md` §4.F).
//!
//! These are the endpoints that hold the connection open, so unlike the
//! rest of the handlers they write directly to the socket via
//! `AsyncWriteExt` instead of returning a buffered `Response` -- the same
//! split the teacher draws between `server.rs`'s request/response turn and
//! a long-lived upgraded connection.

use crate::config::Options;
use crate::error::Error;
use crate::handlers::reflection;
use crate::helpers::duration::bounded;
use crate::http::Request;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;

/// Writes `n` newline-delimited full reflection records, one per line --
/// the streaming analogue of `handlers::reflection::reflect`, each line a
/// valid reflection record in its own right rather than a truncated
/// ad-hoc summary.
pub async fn stream<W: AsyncWrite + Unpin>(
    writer: &mut W,
    req: &Request,
    peer: SocketAddr,
    options: &Options,
    n: u32,
) -> Result<(), Error> {
    let header = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n";
    writer.write_all(header.as_bytes()).await?;

    let mut body = reflection::reflection_body(req, peer, options).await?;
    for i in 0..n {
        body["id"] = serde_json::json!(i);
        write_chunk(writer, format!("{body}\n").as_bytes()).await?;
    }
    write_chunk(writer, b"").await?;
    Ok(())
}

/// Sleeps for `n` seconds (bounded by `Options::max_duration`) before
/// responding with the full reflection record -- used to simulate a slow
/// backend.
pub async fn delay<W: AsyncWrite + Unpin>(
    writer: &mut W,
    req: &Request,
    peer: SocketAddr,
    seconds: f64,
    options: &Options,
) -> Result<(), Error> {
    let requested = Duration::from_secs_f64(seconds.max(0.0));
    sleep(bounded(requested, options.max_duration)).await;

    let body = reflection::reflection_body(req, peer, options).await?.to_string();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body.as_bytes()).await?;
    Ok(())
}

/// Trickles `numbytes` bytes out over `duration`, `code` as the status,
/// honoring defaults from `Options::drip_defaults` when a query parameter
/// is absent.
pub async fn drip<W: AsyncWrite + Unpin>(writer: &mut W, req: &Request, options: &Options) -> Result<(), Error> {
    let defaults = &options.drip_defaults;

    let numbytes: usize = req
        .query_param("numbytes")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| Error::BadRequest("invalid numbytes".into()))?
        .unwrap_or(defaults.numbytes);

    let duration = req
        .query_param("duration")
        .map(crate::helpers::duration::parse_duration)
        .transpose()?
        .unwrap_or(defaults.duration);
    let duration = bounded(duration, options.max_duration);

    let code: u16 = req
        .query_param("code")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| Error::BadRequest("invalid code".into()))?
        .unwrap_or(defaults.code);

    let initial_delay = req
        .query_param("delay")
        .map(crate::helpers::duration::parse_duration)
        .transpose()?
        .unwrap_or(defaults.delay);
    if !initial_delay.is_zero() {
        sleep(bounded(initial_delay, options.max_duration)).await;
    }

    let header = format!(
        "HTTP/1.1 {code} \r\nContent-Type: application/octet-stream\r\nContent-Length: {numbytes}\r\n\r\n"
    );
    writer.write_all(header.as_bytes()).await?;

    if numbytes == 0 {
        return Ok(());
    }
    let per_byte = duration / numbytes as u32;
    for _ in 0..numbytes {
        writer.write_all(b"*").await?;
        writer.flush().await?;
        if !per_byte.is_zero() {
            sleep(per_byte).await;
        }
    }
    Ok(())
}

/// `/sse`: emits `count` Server-Sent Events, spread over `duration` after
/// an initial `delay` -- two distinct timing parameters, mirroring `drip`'s
/// initial-delay-plus-per-unit-pacing split rather than conflating the two
/// into a single inter-event gap.
pub async fn sse<W: AsyncWrite + Unpin>(writer: &mut W, req: &Request, options: &Options) -> Result<(), Error> {
    let defaults = &options.sse_defaults;

    let count: u32 = req
        .query_param("count")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| Error::BadRequest("invalid count".into()))?
        .unwrap_or(defaults.count);

    let delay = req
        .query_param("delay")
        .map(crate::helpers::duration::parse_duration)
        .transpose()?
        .unwrap_or(defaults.delay);
    let delay = bounded(delay, options.max_duration);

    let duration = req
        .query_param("duration")
        .map(crate::helpers::duration::parse_duration)
        .transpose()?
        .unwrap_or(defaults.duration);
    let duration = bounded(duration, options.max_duration);

    let header =
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\n\r\n";
    writer.write_all(header.as_bytes()).await?;

    if !delay.is_zero() {
        sleep(delay).await;
    }

    let per_event = if count == 0 { Duration::ZERO } else { duration / count };
    for i in 0..count {
        let event = format!("id: {i}\ndata: {{\"id\":{i}}}\n\n");
        writer.write_all(event.as_bytes()).await?;
        writer.flush().await?;
        if !per_event.is_zero() {
            sleep(per_event).await;
        }
    }
    Ok(())
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), Error> {
    writer
        .write_all(format!("{:x}\r\n", data.len()).as_bytes())
        .await?;
    writer.write_all(data).await?;
    writer.write_all(b"\r\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn peer() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    #[tokio::test]
    async fn stream_writes_n_full_reflection_records() {
        let req = Request::parse(b"GET /stream/3 HTTP/1.1\r\nHost: x\r\n\r\n", Vec::new()).unwrap();
        let options = Options::default();
        let (mut client, mut server) = tokio::io::duplex(4096);
        stream(&mut server, &req, peer(), &options, 3).await.unwrap();
        drop(server);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("chunked"));
        assert_eq!(text.matches("\"method\":\"GET\"").count(), 3);
        assert!(text.contains("\"id\":2"));
    }

    #[tokio::test]
    async fn delay_returns_a_full_reflection_record() {
        let req = Request::parse(b"GET /delay/0 HTTP/1.1\r\nHost: x\r\n\r\n", Vec::new()).unwrap();
        let options = Options::default();
        let (mut client, mut server) = tokio::io::duplex(4096);
        delay(&mut server, &req, peer(), 0.0, &options).await.unwrap();
        drop(server);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"method\":\"GET\""));
        assert!(text.contains("\"headers\""));
    }

    #[tokio::test]
    async fn sse_emits_requested_count() {
        let req = Request::parse(b"GET /sse?count=2&delay=0ms HTTP/1.1\r\n\r\n", Vec::new()).unwrap();
        let options = Options::default();
        let (mut client, mut server) = tokio::io::duplex(4096);
        sse(&mut server, &req, &options).await.unwrap();
        drop(server);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("data:").count(), 2);
    }

    #[tokio::test]
    async fn sse_spreads_events_across_duration_not_delay() {
        let req = Request::parse(
            b"GET /sse?count=2&delay=0ms&duration=0ms HTTP/1.1\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let options = Options::default();
        let (mut client, mut server) = tokio::io::duplex(4096);
        let start = std::time::Instant::now();
        sse(&mut server, &req, &options).await.unwrap();
        drop(server);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
