//! Taut Tunnel Engine
//!
//! Client engine for an encrypted point-to-point tunnel: it provisions a
//! TUN interface and a TCP connection to the relay server, then runs two
//! forwarding pumps that encrypt outgoing packets into self-delimiting
//! frames and decrypt incoming frames back into packets.
//!
//! The core ([`Relay`]) only ever talks to the [`PacketPort`] and
//! [`StreamPort`] contracts from `taut-protocol`, so the whole engine can be
//! driven against in-memory mocks in tests.
//!
//! ```ignore
//! use taut_engine::{Config, Relay};
//!
//! let config = Config::load("/etc/taut/client.toml")?;
//! let relay = Relay::new(config)?;
//! relay.connect().await?;
//! ```
//!
//! [`PacketPort`]: taut_protocol::PacketPort
//! [`StreamPort`]: taut_protocol::StreamPort

mod config;
mod error;
mod event;
mod relay;
mod session;
pub mod socket;
mod stats;

pub use config::{Config, Endpoint, TunnelConfig};
pub use error::{Error, Result};
pub use event::{EventHandler, LoggingEventHandler, RelayEvent};
pub use relay::{Direction, Relay};
pub use session::{Session, SessionState};
pub use stats::{RelayStats, SharedStats, SharedStatsRef};
