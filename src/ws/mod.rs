//! RFC 6455 WebSocket implementation: frame codec, handshake, message
//! assembly, and the serve loop (components A and B).

pub mod engine;
pub mod frame;
pub mod handshake;
pub mod message;
