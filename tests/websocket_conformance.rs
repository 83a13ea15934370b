//! Cross-module WebSocket conformance scenarios (`spec.md` §8): a full
//! handshake followed by a fragmented echo exchange and a policy-violating
//! close, driven end to end rather than unit-by-unit.

use httpmirror::config::Options;
use httpmirror::http::Request;
use httpmirror::ws::{engine, handshake};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn mask(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    payload
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % 4])
        .collect()
}

fn masked_frame(fin: bool, opcode: u8, payload: &[u8]) -> Vec<u8> {
    let key = [0x12, 0x34, 0x56, 0x78];
    let masked = mask(payload, key);
    let mut out = vec![((fin as u8) << 7) | opcode];
    let len = payload.len();
    if len <= 125 {
        out.push(0x80 | len as u8);
    } else {
        out.push(0x80 | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }
    out.extend_from_slice(&key);
    out.extend_from_slice(&masked);
    out
}

#[tokio::test]
async fn handshake_then_fragmented_echo_round_trips() {
    let req = Request::parse(
        b"GET /websocket/echo HTTP/1.1\r\n\
Host: example.com\r\n\
Connection: keep-alive, Upgrade\r\n\
Upgrade: websocket\r\n\
Sec-WebSocket-Version: 13\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        Vec::new(),
    )
    .unwrap();

    let accept = handshake::validate_and_accept(&req).unwrap();
    assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");

    let options = Options::default();
    let (mut client, server) = tokio::io::duplex(8192);

    let serve_task = tokio::spawn(async move {
        engine::serve(server, &options, |message| async move { Some(message) }).await
    });

    // First fragment of a two-part text message "Hello, world!".
    client
        .write_all(&masked_frame(false, 0x1, b"Hello, "))
        .await
        .unwrap();
    client
        .write_all(&masked_frame(true, 0x0, b"world!"))
        .await
        .unwrap();

    let mut first_byte = [0u8; 2];
    client.read_exact(&mut first_byte).await.unwrap();
    assert_eq!(first_byte[0] & 0x0F, 0x1); // echoed back as Text
    let len = (first_byte[1] & 0x7F) as usize;
    let mut payload = vec![0u8; len];
    client.read_exact(&mut payload).await.unwrap();
    assert_eq!(payload, b"Hello, world!");

    // Close the connection cleanly; the server should answer with its own
    // close frame and return.
    client.write_all(&masked_frame(true, 0x8, &[])).await.unwrap();
    let mut close_header = [0u8; 2];
    client.read_exact(&mut close_header).await.unwrap();
    assert_eq!(close_header[0] & 0x0F, 0x8);

    drop(client);
    serve_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn unmasked_client_frame_is_rejected_with_protocol_error_close() {
    let options = Options::default();
    let (mut client, server) = tokio::io::duplex(4096);

    let serve_task =
        tokio::spawn(async move { engine::serve(server, &options, |m| async move { Some(m) }).await });

    // Unmasked text frame: mask bit clear is a protocol violation per RFC 6455.
    client.write_all(&[0x81, 0x05, b'H', b'e', b'l', b'l', b'o']).await.unwrap();

    let mut header = [0u8; 2];
    client.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0] & 0x0F, 0x8); // server answers with a close frame
    let len = (header[1] & 0x7F) as usize;
    let mut payload = vec![0u8; len];
    client.read_exact(&mut payload).await.unwrap();
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    assert_eq!(code, engine::close_code::PROTOCOL_ERROR);

    drop(client);
    assert!(serve_task.await.unwrap().is_err());
}

#[tokio::test]
async fn rejects_handshake_missing_version_header() {
    let req = Request::parse(
        b"GET /websocket/echo HTTP/1.1\r\n\
Connection: Upgrade\r\n\
Upgrade: websocket\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        Vec::new(),
    )
    .unwrap();
    assert!(handshake::validate_and_accept(&req).is_err());
}

