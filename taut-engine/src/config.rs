//! Relay configuration.
//!
//! The configuration file uses TOML with a `[tunnel]` section for the local
//! virtual interface and a `[server]` section for the remote endpoint:
//!
//! ```toml
//! [tunnel]
//! address = "10.0.0.2"
//! netmask = "255.255.255.0"
//! mtu = 1500
//! key = "my-secret-key"
//!
//! [server]
//! host = "vpn.example.com"
//! port = 1194
//! ```

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local tunnel interface settings
    pub tunnel: TunnelConfig,

    /// Remote server endpoint
    pub server: Endpoint,
}

/// Settings for the local virtual interface and the cipher key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Local address of the tunnel interface
    pub address: Ipv4Addr,

    /// Netmask of the tunnel network (default: 255.255.255.0)
    #[serde(default = "default_netmask")]
    pub netmask: Ipv4Addr,

    /// MTU of the tunnel interface (default: 1500)
    #[serde(default = "default_mtu")]
    pub mtu: u16,

    /// Pre-shared encryption key (required)
    pub key: String,

    /// TUN device name (optional; platform picks one if unset)
    #[serde(default)]
    pub device: Option<String>,
}

/// A host/port pair to connect to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn default_netmask() -> Ipv4Addr {
    Ipv4Addr::new(255, 255, 255, 0)
}

fn default_mtu() -> u16 {
    taut_tun::DEFAULT_MTU
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.tunnel.key.is_empty() {
            return Err(Error::Config("key is required".into()));
        }

        if self.tunnel.mtu < 576 {
            return Err(Error::Config(format!(
                "MTU {} is too small (minimum 576)",
                self.tunnel.mtu
            )));
        }

        // Non-contiguous masks are caught here rather than at device creation.
        taut_tun::netmask_to_prefix(self.tunnel.netmask)
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.server.host.is_empty() {
            return Err(Error::Config("server host is required".into()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server port is required".into()));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn sample() -> String {
        r#"# Taut Tunnel Configuration

# Local tunnel interface
[tunnel]
# Local address of the tunnel interface
address = "10.0.0.2"

# Netmask of the tunnel network (default: 255.255.255.0)
netmask = "255.255.255.0"

# MTU for the tunnel interface (default: 1500)
mtu = 1500

# Pre-shared key for encryption (required)
key = "your-secret-key-here"

# TUN device name (optional)
# On Linux: defaults to a system-assigned name if not specified
# device = "taut0"

# Remote relay server
[server]
host = "vpn.example.com"
port = 1194
"#
        .to_string()
    }
}
