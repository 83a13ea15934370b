//! Assembled WebSocket message (component B, data model in `spec.md` §3).
//!
//! Unlike `socket-flow::message::Message`, which is a `Text(String) |
//! Binary(Vec<u8>)` enum, `spec.md` specifies a single record with a
//! `binary` flag derived from the initiating frame's opcode -- kept that
//! way here so the echo handler doesn't need to re-derive the opcode when
//! it re-fragments the reply.

#[derive(Debug, Clone)]
pub struct Message {
    pub binary: bool,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn text(payload: Vec<u8>) -> Self {
        Self {
            binary: false,
            payload,
        }
    }

    pub fn binary(payload: Vec<u8>) -> Self {
        Self {
            binary: true,
            payload,
        }
    }
}
