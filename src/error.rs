use std::string::FromUtf8Error;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::time::error::Elapsed;

/// Crate-wide error taxonomy, grouped the way `socket-flow::error::Error`
/// groups its variants: transport/timeout wrapping first, then framing
/// errors, then the higher-level errors specific to this crate. The type
/// never carries a status code itself -- that mapping happens wherever the
/// error is caught (handler, middleware, or the WebSocket serve loop).
#[derive(Error, Debug)]
pub enum Error {
    #[error("{source}")]
    Timeout {
        #[from]
        source: Elapsed,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("{source}")]
    FromUtf8 {
        #[from]
        source: FromUtf8Error,
    },

    #[error("channel communication error")]
    CommunicationError,

    #[error("{source}")]
    SendError {
        #[from]
        source: SendError<Vec<u8>>,
    },

    // Framing errors (Frame Codec / WebSocket Engine)
    #[error("RSV bits must be zero: no extensions are negotiated")]
    RsvNotZero,

    #[error("control frames must not be fragmented")]
    ControlFramesFragmented,

    #[error("control frame payload exceeds 125 bytes")]
    ControlFramePayloadSize,

    #[error("frame payload exceeds the configured maximum frame size")]
    MaxFrameSize,

    #[error("message payload exceeds the configured maximum message size")]
    MaxMessageSize,

    #[error("invalid continuation frame: no fragmented message in progress")]
    InvalidContinuationFrame,

    #[error("data frame received while a fragmented message is already in progress")]
    FragmentedInProgress,

    #[error("unmasked frame received from client")]
    UnmaskedClientFrame,

    #[error("invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    #[error("invalid close frame: single-byte payload")]
    InvalidCloseFrame,

    #[error("invalid close code: {0}")]
    InvalidCloseCode(u16),

    #[error("text payload is not valid UTF-8")]
    InvalidUtf8,

    // Handshake errors
    #[error("bad handshake request: {0}")]
    BadHandshake(&'static str),

    // HTTP-level errors (Endpoint Handlers / Dispatcher / Middleware)
    #[error("request body exceeds the configured maximum body size")]
    BodyTooLarge,

    #[error("invalid path parameter: {0}")]
    InvalidPathParameter(String),

    #[error("no route matched")]
    NotFound,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error("authorization policy rejected the request: {0}")]
    Forbidden(String),

    #[error("multipart parsing error: {0}")]
    Multipart(String),
}

pub type Result<T> = std::result::Result<T, Error>;
