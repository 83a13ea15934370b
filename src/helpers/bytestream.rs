//! Synthetic seekable byte stream (`spec.md` §4.D, §9 design notes).
//!
//! Backs `/bytes/<n>`, `/stream-bytes/<n>`, and `/range/<n>`: rather than
//! materializing `n` bytes up front, each byte is derived from its
//! position via a small deterministic generator seeded once, so the same
//! `(seed, position)` pair always reproduces the same byte -- required for
//! `/range` to serve a sub-range without regenerating everything before
//! it.
//!
//! `Seek(SeekFrom::End(offset))` intentionally does **not** follow
//! `std::io::Seek`'s convention (`size + offset`, offset usually
//! negative). Per the design notes this stream instead computes
//! `size.saturating_sub(offset)`, i.e. `offset` counts bytes back from the
//! end as a *positive* number. This mismatch is a known, preserved
//! quirk -- not a bug to "fix" by aligning it with `std::io::Seek`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

pub struct ByteStream {
    seed: u64,
    size: u64,
    position: u64,
}

impl ByteStream {
    pub fn new(seed: u64, size: u64) -> Self {
        Self {
            seed,
            size,
            position: 0,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Deterministically derives the byte at absolute stream position
    /// `index` from `seed`, independent of generation order.
    fn byte_at(seed: u64, index: u64) -> u8 {
        let mut x = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        x ^= x >> 33;
        x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
        x ^= x >> 33;
        x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
        x ^= x >> 33;
        (x & 0xFF) as u8
    }
}

impl AsyncRead for ByteStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let remaining = self.size.saturating_sub(self.position);
        let to_write = remaining.min(buf.remaining() as u64) as usize;
        for i in 0..to_write {
            let byte = Self::byte_at(self.seed, self.position + i as u64);
            buf.put_slice(&[byte]);
        }
        self.position += to_write as u64;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for ByteStream {
    fn start_seek(mut self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        self.position = match position {
            io::SeekFrom::Start(offset) => offset,
            io::SeekFrom::End(offset) => self.size.saturating_sub(offset as u64),
            io::SeekFrom::Current(offset) => {
                if offset >= 0 {
                    self.position.saturating_add(offset as u64)
                } else {
                    self.position.saturating_sub((-offset) as u64)
                }
            }
        };
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}
