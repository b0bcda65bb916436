//! AES-256-CBC cipher engine.
//!
//! Every call to [`Cipher::encrypt`] draws a fresh random IV and returns it
//! alongside the ciphertext as a [`Frame`], so the IV always travels on the
//! wire with the data it protects. Decryption only ever uses the IV carried
//! by the frame being decrypted.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::Rng;

use crate::error::{Error, Result};
use crate::frame::Frame;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size, which is also the IV length.
pub const CIPHER_BLOCK_SIZE: usize = 16;

/// AES-256 key length.
pub const CIPHER_KEY_SIZE: usize = 32;

/// Symmetric cipher for tunnel payloads.
///
/// Cheap to clone; holds only the derived key.
#[derive(Clone)]
pub struct Cipher {
    key: [u8; CIPHER_KEY_SIZE],
}

impl Cipher {
    /// Creates a cipher from an arbitrary-length pre-shared key.
    ///
    /// The key is padded or truncated to 32 bytes PKCS#5-style, so any two
    /// peers configured with the same key string derive the same key.
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: pkcs5_pad_key(key),
        }
    }

    /// Encrypts a plaintext into a [`Frame`] under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Frame> {
        let iv: [u8; CIPHER_BLOCK_SIZE] = rand::thread_rng().gen();

        // PKCS#7 always adds at least one padding byte.
        let padded_len = ((plaintext.len() / CIPHER_BLOCK_SIZE) + 1) * CIPHER_BLOCK_SIZE;
        if padded_len > crate::frame::MAX_CIPHERTEXT_LEN {
            return Err(Error::Encryption(format!(
                "plaintext of {} bytes does not fit a frame",
                plaintext.len()
            )));
        }
        let mut buffer = vec![0u8; padded_len];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let cipher = Aes256CbcEnc::new(&self.key.into(), &iv.into());
        let written = cipher
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
            .map_err(|e| Error::Encryption(e.to_string()))?
            .len();
        buffer.truncate(written);

        Ok(Frame::new(iv, buffer))
    }

    /// Decrypts a frame's ciphertext with the IV the frame carries.
    pub fn decrypt(&self, frame: &Frame) -> Result<Vec<u8>> {
        let len = frame.ciphertext.len();
        if len == 0 || len % CIPHER_BLOCK_SIZE != 0 {
            return Err(Error::InvalidFrameLength(len));
        }

        let mut buffer = frame.ciphertext.clone();
        let cipher = Aes256CbcDec::new(&self.key.into(), &frame.iv.into());
        let plaintext = cipher
            .decrypt_padded_mut::<Pkcs7>(&mut buffer)
            .map_err(|e| Error::Decryption(e.to_string()))?;

        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

/// Pads or truncates a key to exactly 32 bytes.
///
/// Shorter keys are repeated PKCS#5-style until the buffer is full; longer
/// keys are truncated.
fn pkcs5_pad_key(key: &[u8]) -> [u8; CIPHER_KEY_SIZE] {
    let mut padded = [0u8; CIPHER_KEY_SIZE];
    if key.is_empty() {
        return padded;
    }
    for (i, byte) in padded.iter_mut().enumerate() {
        *byte = key[i % key.len()];
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cipher() -> Cipher {
        Cipher::new(b"test-key-1234567890")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let c = cipher();
        let plaintext = b"hello tunnel world";

        let frame = c.encrypt(plaintext).unwrap();
        assert_ne!(frame.ciphertext.as_slice(), plaintext.as_slice());
        assert_eq!(frame.ciphertext.len() % CIPHER_BLOCK_SIZE, 0);

        let decrypted = c.decrypt(&frame).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_plaintext() {
        let c = cipher();
        let frame = c.encrypt(b"").unwrap();
        // Empty input still produces one full padding block.
        assert_eq!(frame.ciphertext.len(), CIPHER_BLOCK_SIZE);
        assert_eq!(c.decrypt(&frame).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_block_aligned_plaintext_grows() {
        let c = cipher();
        let plaintext = [0xAAu8; 32];
        let frame = c.encrypt(&plaintext).unwrap();
        // Exact multiple of the block size gains a whole padding block.
        assert_eq!(frame.ciphertext.len(), 48);
        assert_eq!(c.decrypt(&frame).unwrap(), plaintext);
    }

    #[test]
    fn test_large_packet_roundtrip() {
        let c = cipher();
        let plaintext: Vec<u8> = (0..1500).map(|i| (i % 256) as u8).collect();
        let frame = c.encrypt(&plaintext).unwrap();
        assert_eq!(c.decrypt(&frame).unwrap(), plaintext);
    }

    #[test]
    fn test_iv_unique_per_encryption() {
        let c = cipher();
        let mut ivs = HashSet::new();
        for _ in 0..1000 {
            let frame = c.encrypt(b"same plaintext").unwrap();
            assert!(ivs.insert(frame.iv), "IV repeated");
        }
    }

    #[test]
    fn test_same_plaintext_different_ciphertext() {
        let c = cipher();
        let a = c.encrypt(b"identical").unwrap();
        let b = c.encrypt(b"identical").unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let frame = cipher().encrypt(b"secret data").unwrap();
        let other = Cipher::new(b"completely-different-key");
        // Wrong key yields garbage, which fails PKCS#7 unpadding.
        assert!(other.decrypt(&frame).is_err());
    }

    #[test]
    fn test_unaligned_ciphertext_rejected() {
        let c = cipher();
        let frame = Frame::new([0u8; CIPHER_BLOCK_SIZE], vec![0u8; 17]);
        assert!(matches!(
            c.decrypt(&frame),
            Err(Error::InvalidFrameLength(17))
        ));
    }

    #[test]
    fn test_empty_ciphertext_rejected() {
        let c = cipher();
        let frame = Frame::new([0u8; CIPHER_BLOCK_SIZE], Vec::new());
        assert!(matches!(c.decrypt(&frame), Err(Error::InvalidFrameLength(0))));
    }

    #[test]
    fn test_key_padding_deterministic() {
        let a = Cipher::new(b"short");
        let frame = a.encrypt(b"payload").unwrap();
        let b = Cipher::new(b"short");
        assert_eq!(b.decrypt(&frame).unwrap(), b"payload");
    }

    #[test]
    fn test_long_key_truncated() {
        let long = [0x42u8; 64];
        let a = Cipher::new(&long);
        let b = Cipher::new(&long[..32]);
        let frame = a.encrypt(b"payload").unwrap();
        assert_eq!(b.decrypt(&frame).unwrap(), b"payload");
    }
}
