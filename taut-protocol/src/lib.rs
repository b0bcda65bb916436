//! Taut Tunnel Protocol
//!
//! Wire framing and encryption for a point-to-point encrypted tunnel over a
//! reliable byte stream, plus the async port contracts the relay core is
//! written against.
//!
//! Payloads are encrypted with AES-256-CBC under a fresh random IV per
//! packet; the IV travels inside the frame so the receiver never has to
//! guess it:
//!
//! ```rust
//! use taut_protocol::{Cipher, Frame};
//!
//! let cipher = Cipher::new(b"pre-shared-key");
//! let frame = cipher.encrypt(b"one ip packet").unwrap();
//! let wire = frame.encode();
//!
//! let (decoded, consumed) = Frame::decode_next(&wire).unwrap().unwrap();
//! assert_eq!(consumed, wire.len());
//! assert_eq!(cipher.decrypt(&decoded).unwrap(), b"one ip packet");
//! ```

mod crypto;
mod error;
mod frame;
pub mod port;

pub use crypto::{Cipher, CIPHER_BLOCK_SIZE, CIPHER_KEY_SIZE};
pub use error::{Error, Result};
pub use frame::{Frame, FRAME_HEADER_LEN, IV_LEN, MAX_CIPHERTEXT_LEN};
pub use port::{PacketPort, StreamPort};

/// Default MTU for the virtual interface.
pub const DEFAULT_MTU: usize = 1500;

/// Read buffer size for interface and stream reads, sized to hold an MTU
/// packet with framing to spare.
pub const IFACE_BUFSIZE: usize = 2000;
