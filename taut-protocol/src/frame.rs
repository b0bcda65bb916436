//! Wire framing for tunnel payloads.
//!
//! The transport is a byte stream, so every encrypted packet is wrapped in a
//! self-delimiting frame:
//!
//! ```text
//! +----------------+------------------+---------------------+
//! | len: u16 (BE)  | iv: 16 bytes     | ciphertext: len     |
//! +----------------+------------------+---------------------+
//! ```
//!
//! `len` counts only the ciphertext. Because the cipher is block based, a
//! length of zero or one that is not a multiple of the block size can never
//! be produced by a well-behaved sender; such a prefix means the stream is
//! corrupt and the session must end.

use crate::crypto::CIPHER_BLOCK_SIZE;
use crate::error::{Error, Result};

/// IV length on the wire.
pub const IV_LEN: usize = CIPHER_BLOCK_SIZE;

/// Bytes of header before the ciphertext: length prefix + IV.
pub const FRAME_HEADER_LEN: usize = 2 + IV_LEN;

/// Largest ciphertext a frame can carry (the length prefix is a u16).
pub const MAX_CIPHERTEXT_LEN: usize = u16::MAX as usize;

/// One encrypted packet as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// IV the sender used; the receiver decrypts with this, never its own.
    pub iv: [u8; IV_LEN],
    /// AES-CBC ciphertext, always a multiple of the block size.
    pub ciphertext: Vec<u8>,
}

impl Frame {
    pub fn new(iv: [u8; IV_LEN], ciphertext: Vec<u8>) -> Self {
        Self { iv, ciphertext }
    }

    /// Total size of this frame once encoded.
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.ciphertext.len()
    }

    /// Serializes the frame for the wire.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&(self.ciphertext.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.iv);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Tries to decode one frame from the front of `buf`.
    ///
    /// Returns `Ok(Some((frame, consumed)))` when a complete frame is
    /// available, `Ok(None)` when more bytes are needed, and an error when
    /// the buffer can never become a valid frame. The caller drains
    /// `consumed` bytes and calls again; arbitrary chunk boundaries are
    /// fine because no bytes are consumed until a whole frame is present.
    pub fn decode_next(buf: &[u8]) -> Result<Option<(Frame, usize)>> {
        if buf.len() < 2 {
            return Ok(None);
        }

        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        if len == 0 || len % CIPHER_BLOCK_SIZE != 0 {
            return Err(Error::InvalidFrameLength(len));
        }

        let total = FRAME_HEADER_LEN + len;
        if buf.len() < total {
            return Ok(None);
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&buf[2..2 + IV_LEN]);
        let ciphertext = buf[FRAME_HEADER_LEN..total].to_vec();

        Ok(Some((Frame::new(iv, ciphertext), total)))
    }

    /// Decodes exactly one frame filling the whole buffer.
    pub fn decode(buf: &[u8]) -> Result<Frame> {
        match Frame::decode_next(buf)? {
            Some((frame, consumed)) if consumed == buf.len() => Ok(frame),
            Some((_, consumed)) => Err(Error::FrameTooShort {
                expected: consumed,
                actual: buf.len(),
            }),
            None => Err(Error::FrameTooShort {
                expected: Frame::required_len(buf),
                actual: buf.len(),
            }),
        }
    }

    /// How many bytes the frame starting in `buf` needs in total, as far as
    /// can be told from what is buffered. Used to report truncation when the
    /// stream ends mid-frame.
    pub fn required_len(buf: &[u8]) -> usize {
        if buf.len() < 2 {
            return FRAME_HEADER_LEN;
        }
        let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
        FRAME_HEADER_LEN + len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame::new([7u8; IV_LEN], vec![0xABu8; 32])
    }

    #[test]
    fn test_encode_layout() {
        let frame = sample_frame();
        let encoded = frame.encode();
        assert_eq!(encoded.len(), FRAME_HEADER_LEN + 32);
        assert_eq!(&encoded[..2], &[0x00, 0x20]);
        assert_eq!(&encoded[2..18], &[7u8; 16]);
        assert_eq!(&encoded[18..], &[0xABu8; 32]);
    }

    #[test]
    fn test_decode_roundtrip() {
        let frame = sample_frame();
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_next_exact() {
        let frame = sample_frame();
        let encoded = frame.encode();
        let (decoded, consumed) = Frame::decode_next(&encoded).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_next_needs_more_data() {
        let encoded = sample_frame().encode();
        // No split point of a valid frame may error or consume bytes.
        for cut in 0..encoded.len() {
            let result = Frame::decode_next(&encoded[..cut]).unwrap();
            assert!(result.is_none(), "cut at {cut} produced a frame early");
        }
    }

    #[test]
    fn test_decode_next_two_frames_back_to_back() {
        let a = Frame::new([1u8; IV_LEN], vec![1u8; 16]);
        let b = Frame::new([2u8; IV_LEN], vec![2u8; 48]);
        let mut stream = a.encode();
        stream.extend_from_slice(&b.encode());

        let (first, used) = Frame::decode_next(&stream).unwrap().unwrap();
        assert_eq!(first, a);
        let (second, used2) = Frame::decode_next(&stream[used..]).unwrap().unwrap();
        assert_eq!(second, b);
        assert_eq!(used + used2, stream.len());
    }

    #[test]
    fn test_decode_next_trailing_bytes_left_alone() {
        let frame = sample_frame();
        let mut stream = frame.encode();
        stream.extend_from_slice(&[0x00, 0x10]); // start of a next frame
        let (_, consumed) = Frame::decode_next(&stream).unwrap().unwrap();
        assert_eq!(consumed, frame.encoded_len());
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = Frame::decode_next(&[0x00, 0x00, 0xFF]).unwrap_err();
        assert!(matches!(err, Error::InvalidFrameLength(0)));
    }

    #[test]
    fn test_unaligned_length_rejected() {
        // 0x0011 = 17, not a multiple of the block size.
        let err = Frame::decode_next(&[0x00, 0x11]).unwrap_err();
        assert!(matches!(err, Error::InvalidFrameLength(17)));
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let encoded = sample_frame().encode();
        let err = Frame::decode(&encoded[..encoded.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::FrameTooShort { .. }));
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let mut encoded = sample_frame().encode();
        encoded.push(0xFF);
        assert!(Frame::decode(&encoded).is_err());
    }

    #[test]
    fn test_required_len() {
        assert_eq!(Frame::required_len(&[]), FRAME_HEADER_LEN);
        assert_eq!(Frame::required_len(&[0x00]), FRAME_HEADER_LEN);
        assert_eq!(Frame::required_len(&[0x00, 0x20]), FRAME_HEADER_LEN + 32);
    }
}
