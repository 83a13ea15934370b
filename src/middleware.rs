//! Request-shaping middleware chain (component E).
//!
//! The `Handler`/wrapping-`Handler` composition is
//! `platformatic-http-handler::handler::Handler`'s pattern generalized from
//! "decorate one inner handler with one header" to this crate's five fixed
//! stages (body-size limit, CORS/preflight, autohead, method gate,
//! observability), each implemented as a `Middleware` that wraps the
//! `dyn Handler` beneath it.

use crate::config::{Observation, Options};
use crate::error::Error;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::time::Instant;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &Request) -> Result<Response, Error>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(&Request) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Response, Error>> + Send,
{
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        self(req).await
    }
}

/// Rejects requests whose body exceeds `Options::max_body_size` before the
/// inner handler ever sees them.
pub struct BodyLimit<H> {
    inner: H,
    max_body_size: usize,
}

impl<H> BodyLimit<H> {
    pub fn new(inner: H, max_body_size: usize) -> Self {
        Self { inner, max_body_size }
    }
}

#[async_trait]
impl<H: Handler> Handler for BodyLimit<H> {
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        if req.body.len() > self.max_body_size {
            return Err(Error::BodyTooLarge);
        }
        self.inner.handle(req).await
    }
}

/// Answers `OPTIONS` preflight requests directly and stamps
/// `Access-Control-Allow-Origin: *` on every response, matching the
/// permissive CORS posture of the system this crate mirrors.
pub struct Cors<H> {
    inner: H,
}

impl<H> Cors<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for Cors<H> {
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        if req.method == "OPTIONS" {
            return Ok(Response::new(200)
                .header("Access-Control-Allow-Origin", "*")
                .header("Access-Control-Allow-Credentials", "true")
                .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
                .header(
                    "Access-Control-Allow-Headers",
                    req.header("access-control-request-headers")
                        .unwrap_or("*")
                        .to_string(),
                )
                .header("Access-Control-Max-Age", "3600"));
        }

        let response = self.inner.handle(req).await?;
        Ok(response
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Credentials", "true"))
    }
}

/// Routes `HEAD` to the same handler as `GET`, then discards the body
/// while preserving headers and status -- so every `GET` endpoint gets a
/// working `HEAD` for free without a second registration.
pub struct AutoHead<H> {
    inner: H,
}

impl<H> AutoHead<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<H: Handler> Handler for AutoHead<H> {
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        if req.method == "HEAD" {
            let mut get_req = req.clone();
            get_req.method = "GET".to_string();
            let response = self.inner.handle(&get_req).await?;
            return Ok(response.with_body(Vec::new()));
        }
        self.inner.handle(req).await
    }
}

/// Rejects methods outside the fixed allow-list with `405`, the way a
/// router typically enforces per-route method sets -- applied globally
/// here since this crate's routes are matched by path alone.
pub struct MethodGate<H> {
    inner: H,
    allowed: Vec<String>,
}

impl<H> MethodGate<H> {
    pub fn new(inner: H, allowed: Vec<String>) -> Self {
        Self { inner, allowed }
    }
}

#[async_trait]
impl<H: Handler> Handler for MethodGate<H> {
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        if !self.allowed.iter().any(|m| m == &req.method) {
            return Err(Error::MethodNotAllowed);
        }
        self.inner.handle(req).await
    }
}

/// Invokes `Options::observer`, if any, once per request with the
/// method/URI/status/duration the request produced.
pub struct Observe<H> {
    inner: H,
    options: Options,
}

impl<H> Observe<H> {
    pub fn new(inner: H, options: Options) -> Self {
        Self { inner, options }
    }
}

#[async_trait]
impl<H: Handler> Handler for Observe<H> {
    async fn handle(&self, req: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let result = self.inner.handle(req).await;
        let duration = start.elapsed();

        if let Some(observer) = &self.options.observer {
            let (status, bytes_written) = match &result {
                Ok(response) => (response.status, response.body.len() as u64),
                Err(_) => (0, 0),
            };
            observer(&Observation {
                method: req.method.clone(),
                uri: req.path.clone(),
                status,
                bytes_written,
                duration,
                user_agent: req.header("user-agent").map(str::to_string),
                client_ip: req.header("x-forwarded-for").map(str::to_string),
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn req(method: &str) -> Request {
        Request::parse(format!("{method} / HTTP/1.1\r\n\r\n").as_bytes(), Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn body_limit_rejects_oversized_body() {
        let handler = BodyLimit::new(|_: &Request| async { Ok(Response::ok()) }, 4);
        let mut r = req("POST");
        r.body = vec![0u8; 10];
        let err = handler.handle(&r).await.unwrap_err();
        assert!(matches!(err, Error::BodyTooLarge));
    }

    #[tokio::test]
    async fn cors_answers_preflight_without_calling_inner() {
        let called = Arc::new(AtomicBool::new(false));
        let called2 = called.clone();
        let handler = Cors::new(move |_: &Request| {
            let called = called2.clone();
            async move {
                called.store(true, Ordering::SeqCst);
                Ok(Response::ok())
            }
        });
        let response = handler.handle(&req("OPTIONS")).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(!called.load(Ordering::SeqCst));
        assert!(response.has_header("Access-Control-Allow-Origin"));
        assert_eq!(response.header_value("Access-Control-Allow-Credentials"), Some("true"));
    }

    #[tokio::test]
    async fn cors_sets_credentials_on_ordinary_responses_too() {
        let handler = Cors::new(|_: &Request| async { Ok(Response::ok()) });
        let response = handler.handle(&req("GET")).await.unwrap();
        assert_eq!(response.header_value("Access-Control-Allow-Credentials"), Some("true"));
    }

    #[tokio::test]
    async fn autohead_strips_body_but_keeps_status() {
        let handler = AutoHead::new(|_: &Request| async { Ok(Response::text(200, "hello")) });
        let response = handler.handle(&req("HEAD")).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn method_gate_rejects_disallowed_method() {
        let handler = MethodGate::new(
            |_: &Request| async { Ok(Response::ok()) },
            vec!["GET".to_string()],
        );
        let err = handler.handle(&req("POST")).await.unwrap_err();
        assert!(matches!(err, Error::MethodNotAllowed));
    }
}
