//! TUN device error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to create TUN device: {0}")]
    DeviceCreation(String),

    #[error("invalid netmask: {0}")]
    InvalidNetmask(String),
}

impl Error {
    /// True when the failure is a privilege problem (TUN creation needs
    /// root or CAP_NET_ADMIN), so callers can give a useful hint.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Error::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            Error::DeviceCreation(msg) => {
                msg.contains("ermission denied") || msg.contains("EPERM")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classifier() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.is_permission_denied());

        let err = Error::DeviceCreation("Operation not permitted (EPERM)".into());
        assert!(err.is_permission_denied());

        assert!(!Error::Config("bad mtu".into()).is_permission_denied());
    }
}
