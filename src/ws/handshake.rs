//! RFC 6455 handshake (component B, handshake phase).
//!
//! Accept-key derivation matches
//! `socket-flow::utils::generate_websocket_accept_value` byte-for-byte
//! (SHA-1 of `key + GUID`, base64-encoded). Header validation is new: the
//! teacher only ever handshakes as a client dialing a known server, so it
//! never validates an inbound `Upgrade` request the way a server must.

use crate::error::Error;
use crate::http::request::Request;
use base64::prelude::*;
use sha1::{Digest, Sha1};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Validates the upgrade request per `spec.md` §4.B and returns the
/// `Sec-WebSocket-Accept` value to send back. Each condition is checked
/// case-insensitively; `Connection` merely needs to *contain* the token
/// `upgrade` among a comma-separated list (browsers send
/// `Connection: keep-alive, Upgrade`).
pub fn validate_and_accept(req: &Request) -> Result<String, Error> {
    let connection = req
        .header("connection")
        .ok_or(Error::BadHandshake("missing Connection header"))?;
    if !connection
        .split(',')
        .any(|tok| tok.trim().eq_ignore_ascii_case("upgrade"))
    {
        return Err(Error::BadHandshake("Connection header lacks Upgrade"));
    }

    let upgrade = req
        .header("upgrade")
        .ok_or(Error::BadHandshake("missing Upgrade header"))?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::BadHandshake("Upgrade header is not websocket"));
    }

    let version = req
        .header("sec-websocket-version")
        .ok_or(Error::BadHandshake("missing Sec-WebSocket-Version header"))?;
    if version.trim() != "13" {
        return Err(Error::BadHandshake("unsupported websocket version"));
    }

    let key = req
        .header("sec-websocket-key")
        .ok_or(Error::BadHandshake("missing Sec-WebSocket-Key header"))?;

    Ok(accept_key(key.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The canonical RFC 6455 §1.3 example.
    #[test]
    fn accept_key_matches_rfc_example() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }
}
