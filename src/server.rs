//! Accept loop and per-connection request handling (component G/H).
//!
//! The accept loop itself -- `TcpListener::accept` in a `loop`, each
//! connection handed to its own `tokio::spawn` -- is
//! `socket-flow::server::start_server_with_config` carried over directly;
//! what changes is everything downstream of the accept: instead of
//! immediately upgrading every connection to WebSocket, this reads one
//! HTTP request per connection (no persistent keep-alive pipelining) and
//! dispatches it through the middleware chain and router, upgrading only
//! when the request targets the WebSocket endpoint and asks to.

use crate::config::{Options, ServerTunables};
use crate::error::Error;
use crate::handlers;
use crate::http::{Request, Response};
use crate::middleware::{AutoHead, BodyLimit, Cors, Handler, MethodGate, Observe};
use crate::router::Router;
use crate::ws::handshake;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

pub async fn run(addr: SocketAddr, options: Options, tunables: ServerTunables) -> Result<(), Error> {
    let listener = TcpListener::bind(addr).await?;
    info!("httpmirror listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let options = options.clone();
        let tunables = tunables.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, peer, options, tunables).await {
                debug!("connection from {peer} ended: {err}");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    options: Options,
    tunables: ServerTunables,
) -> Result<(), Error> {
    let head = match timeout(tunables.read_header_timeout, read_head(&mut stream, tunables.max_header_bytes)).await {
        Ok(Ok(head)) => head,
        Ok(Err(err)) => return Err(err),
        Err(_) => return Err(Error::BadRequest("timed out reading request head".into())),
    };

    let mut req = Request::parse(&head, Vec::new())?;

    if let Some(len) = req.content_length() {
        if len > options.max_body_size {
            write_error(&mut stream, Error::BodyTooLarge).await?;
            return Ok(());
        }
        let mut body = vec![0u8; len];
        timeout(tunables.read_timeout, stream.read_exact(&mut body))
            .await
            .map_err(|e| Error::Timeout { source: e })??;
        req.body = body;
    }

    if is_websocket_upgrade(&req) {
        return handle_websocket(stream, &req, &options).await;
    }

    let prefixed = |suffix: &str| format!("{}{}", options.prefix, suffix);
    if req.path == prefixed("/stream") || req.path.starts_with(&prefixed("/stream/")) {
        return handle_streaming(&mut stream, &req, peer, &options, StreamingKind::Stream).await;
    }
    if req.path.starts_with(&prefixed("/delay/")) {
        return handle_streaming(&mut stream, &req, peer, &options, StreamingKind::Delay).await;
    }
    if req.path == prefixed("/drip") {
        return handle_streaming(&mut stream, &req, peer, &options, StreamingKind::Drip).await;
    }
    if req.path == prefixed("/sse") {
        return handle_streaming(&mut stream, &req, peer, &options, StreamingKind::Sse).await;
    }
    if req.path.starts_with(&prefixed("/stream-bytes/")) {
        if let Err(err) = handlers::bytes::stream_bytes(&mut stream, &req).await {
            error!("stream-bytes handler failed: {err}");
        }
        return Ok(());
    }

    let handler = build_handler(peer, options.clone());
    let response = match handler.handle(&req).await {
        Ok(response) => response,
        Err(err) => {
            warn!("request {} {} failed: {err}", req.method, req.path);
            response_for_error(&err)
        }
    };

    stream.write_all(&response.to_bytes()).await?;
    Ok(())
}

enum StreamingKind {
    Stream,
    Delay,
    Drip,
    Sse,
}

async fn handle_streaming(
    stream: &mut TcpStream,
    req: &Request,
    peer: SocketAddr,
    options: &Options,
    kind: StreamingKind,
) -> Result<(), Error> {
    let result = match kind {
        StreamingKind::Stream => {
            let n: u32 = req
                .path
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10);
            handlers::streaming::stream(stream, req, peer, options, n).await
        }
        StreamingKind::Delay => {
            let seconds: f64 = req
                .path
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0);
            handlers::streaming::delay(stream, req, peer, seconds, options).await
        }
        StreamingKind::Drip => handlers::streaming::drip(stream, req, options).await,
        StreamingKind::Sse => handlers::streaming::sse(stream, req, options).await,
    };

    if let Err(err) = result {
        error!("streaming handler failed: {err}");
    }
    Ok(())
}

fn is_websocket_upgrade(req: &Request) -> bool {
    req.header("upgrade")
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

async fn handle_websocket(mut stream: TcpStream, req: &Request, options: &Options) -> Result<(), Error> {
    let accept = match handshake::validate_and_accept(req) {
        Ok(accept) => accept,
        Err(err) => return write_error(&mut stream, err).await,
    };

    let response = format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );
    stream.write_all(response.as_bytes()).await?;

    handlers::websocket::echo(stream, options).await
}

fn build_handler(peer: SocketAddr, options: Options) -> impl Handler {
    let mut router = Router::new(options.prefix.clone());

    {
        let opts = options.clone();
        for path in ["/get", "/post", "/put", "/patch", "/delete", "/anything"] {
            let opts = opts.clone();
            router.route(
                path,
                Arc::new(move |req: &Request| {
                    let opts = opts.clone();
                    let req = req.clone();
                    async move { handlers::reflection::reflect(&req, peer, &opts).await }
                }),
            );
        }
    }
    {
        let opts = options.clone();
        router.route_prefix(
            "/anything",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::reflection::reflect(&req, peer, &opts).await }
            }),
        );
    }
    {
        let opts = options.clone();
        router.route(
            "/hostname",
            Arc::new(move |_: &Request| {
                let opts = opts.clone();
                async move { handlers::reflection::hostname(&opts).await }
            }),
        );
    }
    router.route(
        "/dump/request",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::reflection::dump_request(&req).await }
        }),
    );

    router.route_prefix(
        "/status",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::status::status(&req).await }
        }),
    );
    router.route(
        "/unstable",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::status::unstable(&req).await }
        }),
    );
    router.route(
        "/response-headers",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::status::response_headers(&req).await }
        }),
    );

    {
        let opts = options.clone();
        router.route_prefix(
            "/redirect",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::redirect::redirect(&req, &opts).await }
            }),
        );
    }
    router.route_prefix(
        "/relative-redirect",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::redirect::relative_redirect(&req).await }
        }),
    );
    {
        let opts = options.clone();
        router.route_prefix(
            "/absolute-redirect",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::redirect::absolute_redirect(&req, &opts).await }
            }),
        );
    }
    {
        let opts = options.clone();
        router.route(
            "/redirect-to",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::redirect::redirect_to(&req, &opts).await }
            }),
        );
    }

    router.route(
        "/cookies",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::cookies::list(&req).await }
        }),
    );
    router.route(
        "/cookies/set",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::cookies::set(&req).await }
        }),
    );
    router.route(
        "/cookies/delete",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::cookies::delete(&req).await }
        }),
    );

    router.route_prefix(
        "/basic-auth",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::auth::basic_auth(&req).await }
        }),
    );
    router.route_prefix(
        "/digest-auth",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::auth::digest_auth(&req).await }
        }),
    );
    router.route_prefix(
        "/hidden-basic-auth",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::auth::hidden_basic_auth(&req).await }
        }),
    );
    router.route(
        "/bearer",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::auth::bearer(&req).await }
        }),
    );

    {
        let opts = options.clone();
        router.route(
            "/gzip",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::compression::gzip(&req, peer, &opts).await }
            }),
        );
    }
    {
        let opts = options.clone();
        router.route(
            "/deflate",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::compression::deflate(&req, peer, &opts).await }
            }),
        );
    }

    router.route_prefix(
        "/bytes",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::bytes::bytes(&req).await }
        }),
    );
    router.route_prefix(
        "/range",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::range::range(&req).await }
        }),
    );

    {
        let opts = options.clone();
        router.route(
            "/cache",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::cache::cache(&req, peer, &opts).await }
            }),
        );
    }
    router.route_prefix(
        "/cache",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::cache::cache_for(&req).await }
        }),
    );
    router.route_prefix(
        "/etag",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::cache::etag(&req).await }
        }),
    );

    router.route_prefix(
        "/links",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::links::links(&req).await }
        }),
    );

    {
        let opts = options.clone();
        router.route(
            "/",
            Arc::new(move |_: &Request| {
                let opts = opts.clone();
                async move { handlers::misc::index(&opts).await }
            }),
        );
    }
    {
        let opts = options.clone();
        router.route(
            "/forms/post",
            Arc::new(move |_: &Request| {
                let opts = opts.clone();
                async move { handlers::misc::forms_post(&opts).await }
            }),
        );
    }
    {
        let opts = options.clone();
        router.route(
            "/encoding/utf8",
            Arc::new(move |_: &Request| {
                let opts = opts.clone();
                async move { handlers::misc::encoding_utf8(&opts).await }
            }),
        );
    }
    router.route(
        "/uuid",
        Arc::new(|_: &Request| async { handlers::misc::uuid().await }),
    );
    router.route_prefix(
        "/base64",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::misc::base64(&req).await }
        }),
    );
    {
        let opts = options.clone();
        router.route(
            "/headers",
            Arc::new(move |req: &Request| {
                let opts = opts.clone();
                let req = req.clone();
                async move { handlers::misc::headers(&req, &opts).await }
            }),
        );
    }
    router.route(
        "/ip",
        Arc::new(move |req: &Request| {
            let req = req.clone();
            async move { handlers::misc::ip_addr(&req, peer).await }
        }),
    );
    router.route(
        "/user-agent",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::misc::user_agent(&req).await }
        }),
    );
    router.route(
        "/robots.txt",
        Arc::new(|_: &Request| async { handlers::misc::robots_txt().await }),
    );
    router.route(
        "/deny",
        Arc::new(|_: &Request| async { handlers::misc::deny().await }),
    );

    router.route(
        "/html",
        Arc::new(|_: &Request| async { handlers::payloads::html().await }),
    );
    router.route(
        "/xml",
        Arc::new(|_: &Request| async { handlers::payloads::xml().await }),
    );
    router.route(
        "/json",
        Arc::new(|_: &Request| async { handlers::payloads::json().await }),
    );
    router.route(
        "/image",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::payloads::image(&req).await }
        }),
    );
    router.route_prefix(
        "/image",
        Arc::new(|req: &Request| {
            let req = req.clone();
            async move { handlers::payloads::image_format(&req).await }
        }),
    );

    let router = Arc::new(router);
    let dispatch = move |req: &Request| {
        let router = router.clone();
        let req = req.clone();
        async move {
            let handler = router.resolve(&req)?;
            handler.handle(&req).await
        }
    };

    let allowed_methods = vec![
        "GET".to_string(),
        "HEAD".to_string(),
        "POST".to_string(),
        "PUT".to_string(),
        "PATCH".to_string(),
        "DELETE".to_string(),
        "OPTIONS".to_string(),
    ];

    Observe::new(
        AutoHead::new(Cors::new(MethodGate::new(
            BodyLimit::new(dispatch, options.max_body_size),
            allowed_methods,
        ))),
        options,
    )
}

async fn read_head(stream: &mut TcpStream, max_header_bytes: usize) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(Error::BadRequest("connection closed before request head".into()));
        }
        buf.push(byte[0]);
        if buf.len() > max_header_bytes {
            return Err(Error::BadRequest("request head too large".into()));
        }
        if buf.ends_with(b"\r\n\r\n") {
            return Ok(buf);
        }
    }
}

async fn write_error(stream: &mut TcpStream, err: Error) -> Result<(), Error> {
    let response = response_for_error(&err);
    stream.write_all(&response.to_bytes()).await?;
    Ok(())
}

fn response_for_error(err: &Error) -> Response {
    let status = match err {
        Error::NotFound => 404,
        Error::MethodNotAllowed => 405,
        Error::BodyTooLarge => 413,
        Error::Forbidden(_) => 403,
        Error::BadRequest(_) | Error::InvalidPathParameter(_) | Error::BadHandshake(_) => 400,
        _ => 500,
    };
    Response::text(status, err.to_string())
}
