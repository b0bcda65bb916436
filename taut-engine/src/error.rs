//! Engine error types.

use thiserror::Error;

use crate::relay::Direction;
use crate::session::SessionState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file parse error
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to set up a collaborator before the session could start.
    #[error("provisioning error: {0}")]
    Provision(String),

    /// Protocol-level failure (framing, cipher, port I/O).
    #[error("protocol error: {0}")]
    Protocol(#[from] taut_protocol::Error),

    /// A pump task panicked.
    #[error("pump task failed: {0}")]
    Task(String),

    /// A forwarding pump died; `source` is the underlying failure.
    #[error("{direction} pump failed: {source}")]
    Pump {
        direction: Direction,
        source: Box<Error>,
    },

    /// Invalid session state transition.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: SessionState,
        to: SessionState,
    },

    /// The relay has already been started.
    #[error("relay is already running")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a pump failure with the direction it happened in.
    pub fn in_direction(self, direction: Direction) -> Self {
        Error::Pump {
            direction,
            source: Box::new(self),
        }
    }

    /// True if the failure is a setup problem the user can fix in the
    /// configuration, as opposed to a runtime failure.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_) | Error::ConfigParse(_))
    }

    /// The underlying error of a pump failure, or the error itself.
    pub fn root(&self) -> &Error {
        match self {
            Error::Pump { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_error_carries_direction() {
        let err = Error::Protocol(taut_protocol::Error::ConnectionClosed)
            .in_direction(Direction::Inbound);
        assert!(err.to_string().contains("transport-to-interface"));
        assert!(matches!(
            err.root(),
            Error::Protocol(taut_protocol::Error::ConnectionClosed)
        ));
    }

    #[test]
    fn test_config_classifier() {
        assert!(Error::Config("key is required".into()).is_config_error());
        assert!(!Error::AlreadyRunning.is_config_error());
    }
}
