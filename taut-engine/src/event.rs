//! Relay events.

use std::net::Ipv4Addr;

use crate::session::SessionState;

/// Events emitted by the relay.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// State changed
    StateChanged {
        old: SessionState,
        new: SessionState,
    },

    /// Connected to the server and forwarding traffic
    Connected {
        /// Local tunnel address
        tunnel_ip: Ipv4Addr,
        /// Server endpoint as configured
        peer: String,
    },

    /// Session ended
    Disconnected {
        /// Reason for disconnection
        reason: String,
    },

    /// Error occurred
    Error {
        /// Error message
        message: String,
    },
}

/// Event handler trait for receiving relay events
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: RelayEvent);
}

/// Simple event handler that logs events
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingEventHandler {
    async fn on_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::StateChanged { old, new } => {
                log::info!("session state: {} -> {}", old, new);
            }
            RelayEvent::Connected { tunnel_ip, peer } => {
                log::info!("connected: tunnel={}, server={}", tunnel_ip, peer);
            }
            RelayEvent::Disconnected { reason } => {
                log::info!("disconnected: {}", reason);
            }
            RelayEvent::Error { message } => {
                log::error!("relay error: {}", message);
            }
        }
    }
}
