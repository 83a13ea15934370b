//! `/websocket/echo` (component B wired into the handler surface).
//!
//! The handshake (`ws::handshake`) happens before this is called, since it
//! needs to answer with a `101` over the same raw stream the HTTP layer
//! was using; this just drives the post-handshake echo loop via
//! `ws::engine::serve`.

use crate::config::Options;
use crate::error::Error;
use crate::ws::engine;
use crate::ws::message::Message;
use tokio::io::{AsyncRead, AsyncWrite};

pub async fn echo<S>(stream: S, options: &Options) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    engine::serve(stream, options, |message: Message| async move { Some(message) }).await
}
