//! RFC 6455 frame codec (component A).
//!
//! The bit-twiddling here is lifted straight out of
//! `socket-flow::read::ReadStream::read_frame` and
//! `socket-flow::write::Writer::write_frame_server`, generalized into free
//! functions over any `AsyncRead`/`AsyncWrite` so they can be driven from
//! the serve loop in `ws::engine` without a live connection struct, and
//! unit-tested against fixed byte vectors.
//!
//! Extensions are unsupported (`spec.md` §4.A): `rsv1`/`rsv2`/`rsv3` must
//! all be zero, so unlike the teacher crate there is no per-frame
//! `compressed` flag.

use crate::error::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Server frames never exceed this size; a control frame or handshake that
/// claims more is always a protocol violation, not merely oversize.
pub const MAX_PAYLOAD_SIZE: usize = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(Error::InvalidOpcode(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload,
        }
    }

    pub fn close(code: u16, reason: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason);
        Frame::new(true, OpCode::Close, payload)
    }
}

/// Reads exactly one frame from `reader`. Per `spec.md` §4.A, the mask bit
/// on a client frame MUST be set -- an unmasked frame is a protocol error,
/// mirroring the RSV-bit check just below it.
pub async fn decode<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, Error> {
    let mut header = [0u8; 2];
    reader.read_exact(&mut header).await?;

    let fin = (header[0] & 0b1000_0000) != 0;
    let rsv1 = (header[0] & 0b0100_0000) != 0;
    let rsv2 = (header[0] & 0b0010_0000) != 0;
    let rsv3 = (header[0] & 0b0001_0000) != 0;
    let opcode = OpCode::from_byte(header[0] & 0b0000_1111)?;

    if rsv1 || rsv2 || rsv3 {
        return Err(Error::RsvNotZero);
    }
    if !fin && opcode.is_control() {
        return Err(Error::ControlFramesFragmented);
    }

    let masked = (header[1] & 0b1000_0000) != 0;
    if !masked {
        return Err(Error::UnmaskedClientFrame);
    }

    let mut length = (header[1] & 0b0111_1111) as usize;
    if length > 125 && opcode.is_control() {
        return Err(Error::ControlFramePayloadSize);
    }

    if length == 126 {
        let mut be = [0u8; 2];
        reader.read_exact(&mut be).await?;
        length = u16::from_be_bytes(be) as usize;
    } else if length == 127 {
        let mut be = [0u8; 8];
        reader.read_exact(&mut be).await?;
        length = u64::from_be_bytes(be) as usize;
    }

    if length > MAX_PAYLOAD_SIZE {
        return Err(Error::MaxFrameSize);
    }

    let mut mask = [0u8; 4];
    reader.read_exact(&mut mask).await?;

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }

    Ok(Frame {
        fin,
        rsv1: false,
        rsv2: false,
        rsv3: false,
        opcode,
        payload,
    })
}

/// Serializes a frame, unmasked, the way the server always writes to the
/// client per RFC 6455 (only client->server frames are masked).
pub fn encode(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(14 + frame.payload.len());
    let first_byte = ((frame.fin as u8) << 7) | frame.opcode.as_u8();
    out.push(first_byte);

    let len = frame.payload.len();
    if len <= 125 {
        out.push(len as u8);
    } else if len <= 65535 {
        out.push(126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    out.extend_from_slice(&frame.payload);
    out
}

pub async fn write<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Frame) -> Result<(), Error> {
    writer.write_all(&encode(frame)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mask_payload(payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
        payload
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ mask[i % 4])
            .collect()
    }

    #[tokio::test]
    async fn decode_masked_text_frame() {
        let mask = [0x37, 0xfa, 0x21, 0x3d];
        let payload = mask_payload(b"Hello", mask);
        let mut bytes = vec![0x81, 0x80 | 5];
        bytes.extend_from_slice(&mask);
        bytes.extend_from_slice(&payload);

        let mut cursor = Cursor::new(bytes);
        let frame = decode(&mut cursor).await.unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload, b"Hello");
    }

    #[tokio::test]
    async fn decode_rejects_unmasked_frame() {
        let bytes = vec![0x81, 5, b'H', b'e', b'l', b'l', b'o'];
        let mut cursor = Cursor::new(bytes);
        let err = decode(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::UnmaskedClientFrame));
    }

    #[tokio::test]
    async fn decode_rejects_nonzero_rsv() {
        let mask = [0u8; 4];
        let mut bytes = vec![0xC1, 0x80]; // rsv1 set
        bytes.extend_from_slice(&mask);
        let mut cursor = Cursor::new(bytes);
        let err = decode(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::RsvNotZero));
    }

    #[tokio::test]
    async fn decode_16_bit_length() {
        let mask = [1, 2, 3, 4];
        let payload = vec![0u8; 200];
        let masked = mask_payload(&payload, mask);
        let mut bytes = vec![0x82, 0x80 | 126];
        bytes.extend_from_slice(&(200u16).to_be_bytes());
        bytes.extend_from_slice(&mask);
        bytes.extend_from_slice(&masked);

        let mut cursor = Cursor::new(bytes);
        let frame = decode(&mut cursor).await.unwrap();
        assert_eq!(frame.opcode, OpCode::Binary);
        assert_eq!(frame.payload.len(), 200);
    }

    #[test]
    fn encode_roundtrips_length_classes() {
        let small = Frame::new(true, OpCode::Text, vec![1, 2, 3]);
        let bytes = encode(&small);
        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], 3);

        let medium = Frame::new(true, OpCode::Binary, vec![0u8; 200]);
        let bytes = encode(&medium);
        assert_eq!(bytes[1], 126);

        let large = Frame::new(true, OpCode::Binary, vec![0u8; 70_000]);
        let bytes = encode(&large);
        assert_eq!(bytes[1], 127);
    }

    #[test]
    fn close_frame_encodes_code_and_reason() {
        let frame = Frame::close(1000, b"bye");
        assert_eq!(&frame.payload[0..2], &1000u16.to_be_bytes());
        assert_eq!(&frame.payload[2..], b"bye");
    }

    #[test]
    fn control_frame_is_control() {
        assert!(OpCode::Ping.is_control());
        assert!(OpCode::Close.is_control());
        assert!(!OpCode::Text.is_control());
    }
}
