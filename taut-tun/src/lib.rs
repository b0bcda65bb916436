//! TUN virtual interface provider for the taut tunnel relay.
//!
//! Creates and configures a TUN device through `tun-rs` and exposes it as a
//! [`taut_protocol::PacketPort`], so the relay core stays ignorant of the
//! platform.
//!
//! # Platform Requirements
//!
//! - **Linux**: root or `CAP_NET_ADMIN`, TUN kernel module loaded
//! - **macOS**: root (utun)
//!
//! # Example
//!
//! ```ignore
//! use std::net::Ipv4Addr;
//! use taut_tun::{TunConfig, TunDevice};
//!
//! let config = TunConfig::builder()
//!     .ipv4(Ipv4Addr::new(10, 0, 0, 2), 24)
//!     .mtu(1500)
//!     .build()?;
//! let device = TunDevice::create(config).await?;
//! ```

mod config;
mod device;
mod error;

pub use config::{netmask_to_prefix, prefix_to_netmask, TunConfig, TunConfigBuilder, DEFAULT_MTU};
pub use device::{DeviceInfo, TunDevice};
pub use error::{Error, Result};
