//! Cookie endpoints: `/cookies`, `/cookies/set`, `/cookies/delete`
//! (`spec.md` §4.F).

use crate::error::Error;
use crate::http::{Request, Response};
use serde_json::json;

fn parse_cookie_header(header: Option<&str>) -> Vec<(String, String)> {
    header
        .unwrap_or("")
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

pub async fn list(req: &Request) -> Result<Response, Error> {
    let cookies = parse_cookie_header(req.header("cookie"));
    let body = json!({
        "cookies": cookies.into_iter().collect::<std::collections::HashMap<_, _>>(),
    });
    Ok(Response::json(200, &body))
}

/// `/cookies/set?name=value&...` sets every query parameter as a cookie,
/// then redirects to `/cookies` the way the canonical tool does so a
/// browser visiting the link sees the cookies it just received reflected
/// back.
pub async fn set(req: &Request) -> Result<Response, Error> {
    let mut response = Response::redirect(302, "/cookies");
    for (name, values) in &req.query {
        for value in values {
            response = response.header(
                "Set-Cookie",
                format!("{name}={value}; Path=/"),
            );
        }
    }
    Ok(response)
}

/// `/cookies/delete?name=...` expires the named cookies immediately.
pub async fn delete(req: &Request) -> Result<Response, Error> {
    let mut response = Response::redirect(302, "/cookies");
    for name in req.query.keys() {
        response = response.header(
            "Set-Cookie",
            format!("{name}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"),
        );
    }
    Ok(response)
}
