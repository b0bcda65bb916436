//! Protocol error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the framing, cipher and port layers.
#[derive(Error, Debug)]
pub enum Error {
    /// A buffer was shorter than the structure it was supposed to contain.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    /// The length prefix of a frame is impossible for the cipher in use.
    #[error("invalid frame length: {0} byte ciphertext is not block aligned")]
    InvalidFrameLength(usize),

    /// Encryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Decryption or unpadding failed. Over a byte stream this is fatal:
    /// the receiver cannot prove it is still on a frame boundary.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The virtual interface was closed while an operation was pending.
    #[error("interface closed")]
    InterfaceClosed,

    /// The virtual interface failed.
    #[error("interface error: {0}")]
    Interface(String),

    /// The transport connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// The transport connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that mean "the other end went away" rather than
    /// "something is broken".
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::InterfaceClosed | Error::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FrameTooShort {
            expected: 18,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "frame too short: expected at least 18 bytes, got 3"
        );

        let err = Error::InvalidFrameLength(17);
        assert!(err.to_string().contains("17"));
    }

    #[test]
    fn test_is_closed() {
        assert!(Error::InterfaceClosed.is_closed());
        assert!(Error::ConnectionClosed.is_closed());
        assert!(!Error::Decryption("bad padding".into()).is_closed());
    }
}
