//! WebSocket serve loop (component B, serve-loop + validation + close-code
//! taxonomy from `spec.md` §4.B).
//!
//! The fragment-assembly state machine is `socket-flow::read::ReadStream::
//! poll_messages` carried over almost line for line (continuation-frame
//! bookkeeping, the "already in progress" / "nothing to continue" error
//! pair), generalized to work directly against the frame codec in
//! `ws::frame` instead of against a connection struct, and without the
//! per-message-deflate branch (`spec.md` §4.A: extensions unsupported).
//! Close-code validation follows `fastwebsockets`'s
//! `WebSocketRead::read_frame` close-frame handling (payload-length-1 is
//! invalid, code then UTF-8 reason, reserved codes rejected).

use crate::config::Options;
use crate::error::Error;
use crate::ws::frame::{self, Frame, OpCode};
use crate::ws::message::Message;
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};

/// Close codes the server itself assembles when ending a connection
/// (`spec.md` §4.B close-code taxonomy).
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const INVALID_PAYLOAD: u16 = 1007;
    pub const POLICY: u16 = 1008;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Codes a well-behaved peer must never send on the wire (`spec.md` §4.B).
fn is_reserved_close_code(code: u16) -> bool {
    matches!(code, 1004 | 1005 | 1006 | 1015 | 1016 | 1100 | 2000 | 2999)
}

fn is_valid_close_code(code: u16) -> bool {
    (1000..5000).contains(&code) && !is_reserved_close_code(code)
}

/// Validates a close frame's payload per `spec.md` §4.B: zero-length is a
/// normal close with no code; length 1 is always invalid; otherwise the
/// first two bytes are a close code that must be in range and not
/// reserved, and any trailing bytes must be valid UTF-8.
fn validate_close_payload(payload: &[u8]) -> Result<(), Error> {
    match payload.len() {
        0 => Ok(()),
        1 => Err(Error::InvalidCloseFrame),
        _ => {
            let code = u16::from_be_bytes([payload[0], payload[1]]);
            if !is_valid_close_code(code) {
                return Err(Error::InvalidCloseCode(code));
            }
            std::str::from_utf8(&payload[2..]).map_err(|_| Error::InvalidUtf8)?;
            Ok(())
        }
    }
}

struct FragmentedMessage {
    opcode: OpCode,
    fragments: Vec<u8>,
}

/// Splits `message` into frames of at most `max_fragment_size` bytes, the
/// first carrying the message's own opcode and subsequent ones
/// `Continuation`, with `fin` set only on the last -- mirrors
/// `socket-flow::message::Message::to_frames`.
pub fn fragment_message(message: &Message, max_fragment_size: usize) -> Vec<Frame> {
    let opcode = if message.binary {
        OpCode::Binary
    } else {
        OpCode::Text
    };

    if message.payload.is_empty() {
        return vec![Frame::new(true, opcode, Vec::new())];
    }

    let mut frames = Vec::new();
    for chunk in message.payload.chunks(max_fragment_size.max(1)) {
        let op = if frames.is_empty() {
            opcode
        } else {
            OpCode::Continuation
        };
        frames.push(Frame::new(false, op, chunk.to_vec()));
    }
    if let Some(last) = frames.last_mut() {
        last.fin = true;
    }
    frames
}

/// Drives the serve loop described in `spec.md` §4.B over an already
/// handshaken duplex stream. `on_message` is invoked once per assembled
/// message; its return value, if any, is fragmented and written back in
/// order. Returns once a close frame has been sent (peer-initiated or
/// because validation failed).
pub async fn serve<S, F, Fut>(mut stream: S, options: &Options, mut on_message: F) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnMut(Message) -> Fut,
    Fut: Future<Output = Option<Message>>,
{
    let mut in_progress: Option<FragmentedMessage> = None;

    loop {
        let frame = match frame::decode(&mut stream).await {
            Ok(frame) => frame,
            Err(Error::Io { source }) if is_peer_reset(&source) => return Ok(()),
            Err(err) => {
                let code = close_code_for(&err);
                let _ = frame::write(&mut stream, &Frame::close(code, b"")).await;
                return Err(err);
            }
        };

        if frame.payload.len() > options.ws_max_fragment_size && !frame.opcode.is_control() {
            let _ = frame::write(
                &mut stream,
                &Frame::close(close_code::MESSAGE_TOO_BIG, b"fragment too large"),
            )
            .await;
            return Err(Error::MaxFrameSize);
        }

        match frame.opcode {
            OpCode::Text | OpCode::Binary => {
                if in_progress.is_some() {
                    let _ = frame::write(
                        &mut stream,
                        &Frame::close(close_code::PROTOCOL_ERROR, b""),
                    )
                    .await;
                    return Err(Error::FragmentedInProgress);
                }

                if !frame.fin {
                    in_progress = Some(FragmentedMessage {
                        opcode: frame.opcode,
                        fragments: frame.payload,
                    });
                    continue;
                }

                if frame.opcode == OpCode::Text && std::str::from_utf8(&frame.payload).is_err() {
                    let _ = frame::write(
                        &mut stream,
                        &Frame::close(close_code::INVALID_PAYLOAD, b""),
                    )
                    .await;
                    return Err(Error::InvalidUtf8);
                }

                let message = Message {
                    binary: frame.opcode == OpCode::Binary,
                    payload: frame.payload,
                };
                if let Some(reply) = on_message(message).await {
                    write_message(&mut stream, &reply, options.ws_max_fragment_size).await?;
                }
            }

            OpCode::Continuation => {
                let Some(ref mut pending) = in_progress else {
                    let _ = frame::write(
                        &mut stream,
                        &Frame::close(close_code::PROTOCOL_ERROR, b""),
                    )
                    .await;
                    return Err(Error::InvalidContinuationFrame);
                };

                pending.fragments.extend_from_slice(&frame.payload);
                if pending.fragments.len() > options.ws_max_message_size {
                    let _ = frame::write(
                        &mut stream,
                        &Frame::close(close_code::MESSAGE_TOO_BIG, b""),
                    )
                    .await;
                    return Err(Error::MaxMessageSize);
                }

                if frame.fin {
                    let pending = in_progress.take().unwrap();
                    if pending.opcode == OpCode::Text
                        && std::str::from_utf8(&pending.fragments).is_err()
                    {
                        let _ = frame::write(
                            &mut stream,
                            &Frame::close(close_code::INVALID_PAYLOAD, b""),
                        )
                        .await;
                        return Err(Error::InvalidUtf8);
                    }

                    let message = Message {
                        binary: pending.opcode == OpCode::Binary,
                        payload: pending.fragments,
                    };
                    if let Some(reply) = on_message(message).await {
                        write_message(&mut stream, &reply, options.ws_max_fragment_size).await?;
                    }
                }
            }

            OpCode::Close => {
                if let Err(err) = validate_close_payload(&frame.payload) {
                    let code = close_code_for(&err);
                    let _ = frame::write(&mut stream, &Frame::close(code, b"")).await;
                    return Err(err);
                }
                let _ = frame::write(&mut stream, &Frame::close(close_code::NORMAL, b"")).await;
                return Ok(());
            }

            OpCode::Ping => {
                frame::write(&mut stream, &Frame::new(true, OpCode::Pong, frame.payload)).await?;
            }

            OpCode::Pong => {}
        }
    }
}

async fn write_message<S: AsyncWrite + Unpin>(
    stream: &mut S,
    message: &Message,
    max_fragment_size: usize,
) -> Result<(), Error> {
    for frame in fragment_message(message, max_fragment_size) {
        frame::write(stream, &frame).await?;
    }
    Ok(())
}

fn close_code_for(err: &Error) -> u16 {
    match err {
        Error::InvalidUtf8 => close_code::INVALID_PAYLOAD,
        Error::MaxFrameSize | Error::MaxMessageSize => close_code::MESSAGE_TOO_BIG,
        Error::RsvNotZero
        | Error::ControlFramesFragmented
        | Error::ControlFramePayloadSize
        | Error::InvalidContinuationFrame
        | Error::FragmentedInProgress
        | Error::UnmaskedClientFrame
        | Error::InvalidOpcode(_)
        | Error::InvalidCloseFrame
        | Error::InvalidCloseCode(_) => close_code::PROTOCOL_ERROR,
        _ => close_code::INTERNAL_ERROR,
    }
}

fn is_peer_reset(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_close_codes() {
        assert!(is_valid_close_code(1000));
        assert!(is_valid_close_code(4999));
        assert!(!is_valid_close_code(999));
        assert!(!is_valid_close_code(5000));
        assert!(!is_valid_close_code(1005));
        assert!(!is_valid_close_code(2999));
    }

    #[test]
    fn close_payload_of_one_byte_is_invalid() {
        assert!(matches!(
            validate_close_payload(&[0x03]),
            Err(Error::InvalidCloseFrame)
        ));
    }

    #[test]
    fn close_payload_empty_is_valid() {
        assert!(validate_close_payload(&[]).is_ok());
    }

    #[test]
    fn fragment_message_respects_max_size() {
        let message = Message::text(vec![b'a'; 10]);
        let frames = fragment_message(&message, 3);
        assert_eq!(frames.len(), 4);
        assert!(frames[0].fin == false && frames[0].opcode == OpCode::Text);
        assert!(frames[1].opcode == OpCode::Continuation);
        assert!(frames.last().unwrap().fin);
    }

    #[test]
    fn fragment_empty_message_is_one_frame() {
        let message = Message::binary(Vec::new());
        let frames = fragment_message(&message, 10);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
    }
}
