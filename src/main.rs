use httpmirror::config::{options_from_env, ServerTunables};
use httpmirror::server;
use std::net::SocketAddr;

#[tokio::main]
async fn main() {
    env_logger::init();

    let options = options_from_env();
    let tunables = ServerTunables::default();

    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9000".to_string())
        .parse()
        .expect("LISTEN_ADDR must be a valid socket address");

    if let Err(err) = server::run(addr, options, tunables).await {
        log::error!("server exited: {err}");
        std::process::exit(1);
    }
}
