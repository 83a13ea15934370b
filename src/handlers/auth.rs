//! Authentication endpoints: `/basic-auth/<user>/<passwd>` and
//! `/digest-auth/<qop>/<user>/<passwd>/<algorithm>` (`spec.md` §4.F).

use crate::digest::{self, Algorithm};
use crate::error::Error;
use crate::http::{Request, Response};
use base64::prelude::*;
use serde_json::json;
use uuid::Uuid;

pub async fn basic_auth(req: &Request) -> Result<Response, Error> {
    let rest = req
        .path
        .strip_prefix("/basic-auth/")
        .ok_or_else(|| Error::InvalidPathParameter("missing basic-auth parameters".into()))?;
    let mut parts = rest.splitn(2, '/');
    let expected_user = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing username".into()))?;
    let expected_pass = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing password".into()))?;

    let challenge = || {
        Response::new(401)
            .header("WWW-Authenticate", r#"Basic realm="Fake Realm""#)
    };

    let Some(header) = req.header("authorization") else {
        return Ok(challenge());
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return Ok(challenge());
    };
    let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
        return Ok(challenge());
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return Ok(challenge());
    };
    let Some((user, pass)) = decoded.split_once(':') else {
        return Ok(challenge());
    };

    if user == expected_user && pass == expected_pass {
        Ok(Response::json(
            200,
            &json!({"authenticated": true, "user": user}),
        ))
    } else {
        Ok(challenge())
    }
}

/// `/hidden-basic-auth/<user>/<passwd>`: like `basic_auth`, but a missing or
/// wrong credential answers 404 instead of a 401 challenge, so the endpoint
/// never discloses that authentication is even in play.
pub async fn hidden_basic_auth(req: &Request) -> Result<Response, Error> {
    let rest = req
        .path
        .strip_prefix("/hidden-basic-auth/")
        .ok_or_else(|| Error::InvalidPathParameter("missing basic-auth parameters".into()))?;
    let mut parts = rest.splitn(2, '/');
    let expected_user = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing username".into()))?;
    let expected_pass = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing password".into()))?;

    let not_found = Response::new(404);

    let Some(header) = req.header("authorization") else {
        return Ok(not_found);
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return Ok(not_found);
    };
    let Ok(decoded) = BASE64_STANDARD.decode(encoded.trim()) else {
        return Ok(not_found);
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return Ok(not_found);
    };
    let Some((user, pass)) = decoded.split_once(':') else {
        return Ok(not_found);
    };

    if user == expected_user && pass == expected_pass {
        Ok(Response::json(
            200,
            &json!({"authenticated": true, "user": user}),
        ))
    } else {
        Ok(not_found)
    }
}

/// `/bearer`: accepts any non-empty `Authorization: Bearer <token>` header.
pub async fn bearer(req: &Request) -> Result<Response, Error> {
    let Some(header) = req.header("authorization") else {
        return Ok(Response::new(401).header("WWW-Authenticate", "Bearer"));
    };
    let Some(token) = header.strip_prefix("Bearer ") else {
        return Ok(Response::new(401).header("WWW-Authenticate", "Bearer"));
    };
    let token = token.trim();
    if token.is_empty() {
        return Ok(Response::new(401).header("WWW-Authenticate", "Bearer"));
    }

    Ok(Response::json(
        200,
        &json!({"authenticated": true, "token": token}),
    ))
}

pub async fn digest_auth(req: &Request) -> Result<Response, Error> {
    let rest = req
        .path
        .strip_prefix("/digest-auth/")
        .ok_or_else(|| Error::InvalidPathParameter("missing digest-auth parameters".into()))?;
    let mut parts = rest.splitn(4, '/');
    let _qop = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing qop".into()))?;
    let expected_user = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing username".into()))?;
    let expected_pass = parts
        .next()
        .ok_or_else(|| Error::InvalidPathParameter("missing password".into()))?;
    let algorithm_name = parts.next().unwrap_or("MD5");
    let algorithm = match algorithm_name.to_ascii_uppercase().as_str() {
        "SHA-256" | "SHA256" => Algorithm::Sha256,
        _ => Algorithm::Md5,
    };

    let nonce = Uuid::new_v4().simple().to_string();
    let opaque = Uuid::new_v4().simple().to_string();

    let challenge = || {
        Response::new(401).header(
            "WWW-Authenticate",
            digest::build_challenge("httpmirror", &nonce, &opaque, algorithm),
        )
    };

    let Some(header) = req.header("authorization") else {
        return Ok(challenge());
    };

    let params = digest::parse_authorization(header)?;
    if params.get("username").map(String::as_str) != Some(expected_user) {
        return Ok(challenge());
    }

    if digest::verify(&params, expected_pass, &req.method, algorithm)? {
        Ok(Response::json(
            200,
            &json!({"authenticated": true, "user": expected_user}),
        ))
    } else {
        Ok(challenge())
    }
}
