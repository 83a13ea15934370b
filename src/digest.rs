//! RFC 2617/7616 HTTP Digest Authentication (component C).
//!
//! The teacher's tree has no authentication at all; this module follows
//! the same "parse a structured header into a typed record, then verify"
//! shape as `ws::handshake::validate_and_accept` (parse `Authorization`,
//! then check a derived hash) rather than anything borrowed line-for-line,
//! since there is no pack example of Digest auth to ground the hashing
//! against. MD5 and SHA-256 are both supported per `spec.md` §4.C; the
//! known comma-in-quoted-value parsing limitation described in the design
//! notes is preserved deliberately and must not be "fixed" by a smarter
//! quoted-string parser.

use crate::error::Error;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha256 => "SHA-256",
        }
    }

    fn hash_hex(self, input: &str) -> String {
        match self {
            Algorithm::Md5 => hex(&Md5::digest(input.as_bytes())),
            Algorithm::Sha256 => hex(&Sha256::digest(input.as_bytes())),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: String,
    pub algorithm: Algorithm,
    pub qop: &'static str,
}

/// Builds the `WWW-Authenticate` header value for a fresh 401 challenge.
pub fn build_challenge(realm: &str, nonce: &str, opaque: &str, algorithm: Algorithm) -> String {
    format!(
        r#"Digest realm="{}", qop="auth", nonce="{}", opaque="{}", algorithm={}"#,
        sanitize_realm(realm),
        nonce,
        opaque,
        algorithm.as_str()
    )
}

/// Realm values land inside a quoted header field; backslash and quote
/// characters are escaped so a realm containing either cannot break out of
/// the quoting. This is deliberately shallow -- it does not attempt to fix
/// the comma-in-quoted-value limitation on the parsing side below.
fn sanitize_realm(realm: &str) -> String {
    realm.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parses the client's `Authorization: Digest ...` header into its
/// key/value parameters.
///
/// Known limitation, preserved intentionally: this splits on commas
/// without tracking whether they fall inside a quoted value, so a value
/// like `response="ab,cd"` is parsed as two shorter fields rather than one.
/// RFC 2617 quoted-strings can legally contain commas; real clients avoid
/// putting one in `username`/`uri`, which is the only reason this has
/// never mattered in practice.
pub fn parse_authorization(header: &str) -> Result<HashMap<String, String>, Error> {
    let rest = header
        .strip_prefix("Digest ")
        .ok_or_else(|| Error::BadRequest("Authorization header is not Digest".into()))?;

    let mut params = HashMap::new();
    for part in rest.split(',') {
        let part = part.trim();
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        params.insert(key.trim().to_string(), value.to_string());
    }
    Ok(params)
}

/// Verifies a Digest response per RFC 2617 §3.2.2.1 (`qop=auth`):
/// `HA1 = H(username:realm:password)`,
/// `HA2 = H(method:uri)`,
/// `response = H(HA1:nonce:nc:cnonce:qop:HA2)`.
pub fn verify(
    params: &HashMap<String, String>,
    password: &str,
    method: &str,
    algorithm: Algorithm,
) -> Result<bool, Error> {
    let username = params
        .get("username")
        .ok_or_else(|| Error::BadRequest("missing username in Digest response".into()))?;
    let realm = params
        .get("realm")
        .ok_or_else(|| Error::BadRequest("missing realm in Digest response".into()))?;
    let nonce = params
        .get("nonce")
        .ok_or_else(|| Error::BadRequest("missing nonce in Digest response".into()))?;
    let uri = params
        .get("uri")
        .ok_or_else(|| Error::BadRequest("missing uri in Digest response".into()))?;
    let response = params
        .get("response")
        .ok_or_else(|| Error::BadRequest("missing response in Digest response".into()))?;
    let nc = params.get("nc").map(String::as_str).unwrap_or("");
    let cnonce = params.get("cnonce").map(String::as_str).unwrap_or("");
    let qop = params.get("qop").map(String::as_str).unwrap_or("auth");

    let ha1 = algorithm.hash_hex(&format!("{username}:{realm}:{password}"));
    let ha2 = algorithm.hash_hex(&format!("{method}:{uri}"));
    let expected = algorithm.hash_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"));

    Ok(constant_time_eq(expected.as_bytes(), response.as_bytes()))
}

/// Constant-time comparison so a timing side channel cannot reveal how
/// many leading bytes of a guessed response matched.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_challenge_with_quoted_realm() {
        let header = build_challenge("test realm", "abc123", "xyz", Algorithm::Md5);
        assert!(header.starts_with("Digest realm=\"test realm\""));
        assert!(header.contains("algorithm=MD5"));
    }

    #[test]
    fn round_trips_a_valid_response() {
        let username = "alice";
        let realm = "httpmirror";
        let password = "secret";
        let nonce = "n0nce";
        let uri = "/digest-auth/auth/alice/secret/MD5";
        let nc = "00000001";
        let cnonce = "cn0nce";
        let qop = "auth";
        let method = "GET";

        let ha1 = Algorithm::Md5.hash_hex(&format!("{username}:{realm}:{password}"));
        let ha2 = Algorithm::Md5.hash_hex(&format!("{method}:{uri}"));
        let response = Algorithm::Md5.hash_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"));

        let header = format!(
            r#"Digest username="{username}", realm="{realm}", nonce="{nonce}", uri="{uri}", response="{response}", nc={nc}, cnonce="{cnonce}", qop={qop}"#
        );
        let params = parse_authorization(&header).unwrap();
        assert!(verify(&params, password, method, Algorithm::Md5).unwrap());
    }

    #[test]
    fn rejects_wrong_password() {
        let header = r#"Digest username="alice", realm="httpmirror", nonce="n", uri="/x", response="deadbeef", nc=00000001, cnonce="c", qop=auth"#;
        let params = parse_authorization(header).unwrap();
        assert!(!verify(&params, "secret", "GET", Algorithm::Md5).unwrap());
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
