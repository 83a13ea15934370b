//! `/status/<code(s)>` (`spec.md` §4.F).
//!
//! The path segment after `/status/` is either a single code (`"418"`) or
//! a weighted list (`"200:0.5,404:0.3,500"`) parsed by
//! `helpers::weighted`. A handful of codes carry documented special-case
//! headers/bodies (redirects, auth challenges, the teapot); everything
//! else is a bare status line.

use crate::error::Error;
use crate::helpers::weighted;
use crate::http::{Request, Response};
use rand::Rng;
use serde_json::json;

/// Media types `/status/406` advertises as acceptable, so a client
/// exercising content-negotiation failure has something concrete to parse.
const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "image/webp",
    "image/svg+xml",
    "image/jpeg",
    "image/png",
    "image/*",
];

fn special_case(code: u16) -> Response {
    match code {
        301 | 302 | 303 | 305 | 307 => Response::new(code).header("Location", "/redirect/1"),
        401 => Response::new(401).header("WWW-Authenticate", r#"Basic realm="Fake Realm""#),
        402 => Response::new(402)
            .header("X-More-Info", "http://vimeo.com/22053820")
            .header("Content-Type", "text/plain")
            .with_body(b"Payment Required".to_vec()),
        406 => Response::new(406)
            .header("Content-Type", "application/json")
            .with_body(json!({"media_types": ACCEPTED_MEDIA_TYPES}).to_string().into_bytes()),
        407 => Response::new(407).header("Proxy-Authenticate", r#"Basic realm="Fake Realm""#),
        418 => Response::new(418)
            .header("X-More-Info", "http://tools.ietf.org/html/rfc2324")
            .header("Content-Type", "text/plain")
            .with_body(b"I'm a teapot!".to_vec()),
        _ => Response::new(code),
    }
}

pub async fn status(req: &Request) -> Result<Response, Error> {
    let spec = req
        .path
        .strip_prefix("/status/")
        .ok_or_else(|| Error::InvalidPathParameter("missing status code".into()))?;

    let code = if spec.contains(':') || spec.contains(',') {
        *weighted::parse_weighted_codes(spec)?.pick()
    } else {
        spec.parse()
            .map_err(|_| Error::InvalidPathParameter(format!("invalid status code: {spec}")))?
    };

    if !(100..600).contains(&code) {
        return Err(Error::InvalidPathParameter(format!(
            "status code out of range: {code}"
        )));
    }

    Ok(special_case(code))
}

/// `/unstable`: fails with a 500 a configurable fraction of the time
/// (`?failure_rate=`, default `0.5`), otherwise returns 200. For load-test
/// harnesses exercising retry logic against a flaky dependency.
pub async fn unstable(req: &Request) -> Result<Response, Error> {
    let failure_rate: f64 = req
        .query_param("failure_rate")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.5);
    let failure_rate = failure_rate.clamp(0.0, 1.0);

    if rand::thread_rng().gen_bool(failure_rate) {
        Ok(Response::new(500))
    } else {
        Ok(Response::new(200))
    }
}

/// `/response-headers`: echoes every query parameter back as a response
/// header, letting a caller dictate arbitrary response headers for testing
/// client-side header handling.
pub async fn response_headers(req: &Request) -> Result<Response, Error> {
    let mut response = Response::new(200).header("Content-Type", "application/json");
    for (name, values) in &req.query {
        for value in values {
            response = response.header(name.clone(), value.clone());
        }
    }
    let body = serde_json::to_vec(&req.query).unwrap_or_default();
    Ok(response.with_body(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str) -> Request {
        Request::parse(format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes(), Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn returns_a_single_requested_code() {
        let response = status(&req("/status/418")).await.unwrap();
        assert_eq!(response.status, 418);
    }

    #[tokio::test]
    async fn picks_one_of_a_weighted_list() {
        let response = status(&req("/status/200:1,404:1")).await.unwrap();
        assert!(response.status == 200 || response.status == 404);
    }

    #[tokio::test]
    async fn rejects_out_of_range_code() {
        assert!(status(&req("/status/600")).await.is_err());
        assert!(status(&req("/status/599")).await.is_ok());
    }

    #[tokio::test]
    async fn teapot_carries_documented_body_and_header() {
        let response = status(&req("/status/418")).await.unwrap();
        assert_eq!(response.status, 418);
        assert_eq!(response.header_value("Content-Type"), Some("text/plain"));
        assert_eq!(
            response.header_value("X-More-Info"),
            Some("http://tools.ietf.org/html/rfc2324")
        );
        assert_eq!(response.body, b"I'm a teapot!".as_slice());
    }

    #[tokio::test]
    async fn redirect_codes_point_at_redirect_one() {
        for code in [301, 302, 303, 305, 307] {
            let response = status(&req(&format!("/status/{code}"))).await.unwrap();
            assert_eq!(response.header_value("Location"), Some("/redirect/1"));
        }
    }

    #[tokio::test]
    async fn unauthorized_carries_www_authenticate() {
        let response = status(&req("/status/401")).await.unwrap();
        assert!(response.header_value("WWW-Authenticate").is_some());
    }

    #[tokio::test]
    async fn unstable_always_fails_at_failure_rate_one() {
        let response = unstable(&req("/unstable?failure_rate=1")).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn unstable_never_fails_at_failure_rate_zero() {
        let response = unstable(&req("/unstable?failure_rate=0")).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn response_headers_echoes_query_params_as_headers() {
        let response = response_headers(&req("/response-headers?X-Foo=bar"))
            .await
            .unwrap();
        assert_eq!(response.header_value("X-Foo"), Some("bar"));
    }
}
