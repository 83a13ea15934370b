//! Redirect endpoints: `/redirect/<n>`, `/redirect-to`,
//! `/relative-redirect/<n>`, `/absolute-redirect/<n>` (`spec.md` §4.F).
//!
//! `/redirect-to` is the one endpoint where the target is fully
//! attacker-controlled (an arbitrary `url` query parameter), which is why
//! it is the only one consulting `Options::allowed_redirect_domains`: an
//! empty allow-list means "no restriction", matching the teacher's general
//! preference for opt-in restriction over opt-out.

use crate::config::Options;
use crate::error::Error;
use crate::http::{Request, Response};

fn n_param(req: &Request, prefix: &str) -> Result<u32, Error> {
    let spec = req
        .path
        .strip_prefix(prefix)
        .ok_or_else(|| Error::InvalidPathParameter("missing redirect count".into()))?;
    spec.parse()
        .map_err(|_| Error::InvalidPathParameter(format!("invalid redirect count: {spec}")))
}

/// Chains through `n` internal redirects down to `/get`, relative URLs.
pub async fn relative_redirect(req: &Request) -> Result<Response, Error> {
    let n = n_param(req, "/relative-redirect/")?;
    if n == 0 {
        return Ok(Response::redirect(302, "/get"));
    }
    Ok(Response::redirect(302, &format!("/relative-redirect/{}", n - 1)))
}

/// Same chain, but every `Location` is an absolute URL against `hostname`.
pub async fn absolute_redirect(req: &Request, options: &Options) -> Result<Response, Error> {
    let n = n_param(req, "/absolute-redirect/")?;
    let host = if options.hostname.is_empty() {
        req.header("host").unwrap_or("localhost")
    } else {
        &options.hostname
    };
    if n == 0 {
        return Ok(Response::redirect(302, &format!("http://{host}/get")));
    }
    Ok(Response::redirect(
        302,
        &format!("http://{host}/absolute-redirect/{}", n - 1),
    ))
}

/// `/redirect/<n>` defaults to the relative behavior unless `?absolute=true`.
pub async fn redirect(req: &Request, options: &Options) -> Result<Response, Error> {
    let absolute = req.query_param("absolute") == Some("true");
    if absolute {
        absolute_redirect(req, options).await
    } else {
        relative_redirect(req).await
    }
}

/// `/redirect-to?url=<target>&status_code=<n>`.
pub async fn redirect_to(req: &Request, options: &Options) -> Result<Response, Error> {
    let target = req
        .query_param("url")
        .ok_or_else(|| Error::BadRequest("missing url query parameter".into()))?;

    if !options.allowed_redirect_domains.is_empty() {
        let parsed = url::Url::parse(target)
            .map_err(|_| Error::BadRequest(format!("invalid redirect target: {target}")))?;
        let host = parsed.host_str().unwrap_or("");
        if !options
            .allowed_redirect_domains
            .iter()
            .any(|d| d == host)
        {
            return Err(Error::Forbidden(format!(
                "redirect target domain not allowed: {host}"
            )));
        }
    }

    let status_code: u16 = req
        .query_param("status_code")
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| Error::BadRequest("invalid status_code".into()))?
        .unwrap_or(302);

    Ok(Response::redirect(status_code, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str) -> Request {
        Request::parse(format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes(), Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn relative_redirect_counts_down_to_get() {
        let response = relative_redirect(&req("/relative-redirect/3")).await.unwrap();
        assert_eq!(response.status, 302);
        assert!(response
            .headers()
            .iter()
            .any(|(k, v)| k == "Location" && v == "/relative-redirect/2"));

        let response = relative_redirect(&req("/relative-redirect/0")).await.unwrap();
        assert!(response
            .headers()
            .iter()
            .any(|(k, v)| k == "Location" && v == "/get"));
    }

    #[tokio::test]
    async fn redirect_to_enforces_allowed_domains() {
        let req_obj = Request::parse(
            b"GET /redirect-to?url=https://evil.example/ HTTP/1.1\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let options = Options {
            allowed_redirect_domains: vec!["good.example".to_string()],
            ..Options::default()
        };
        assert!(matches!(
            redirect_to(&req_obj, &options).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn redirect_to_allows_unrestricted_when_empty() {
        let req_obj = Request::parse(
            b"GET /redirect-to?url=https://anywhere.example/ HTTP/1.1\r\n\r\n",
            Vec::new(),
        )
        .unwrap();
        let options = Options::default();
        assert!(redirect_to(&req_obj, &options).await.is_ok());
    }
}
