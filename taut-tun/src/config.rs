//! TUN device configuration.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};

/// Default MTU for tunnel interfaces.
pub const DEFAULT_MTU: u16 = 1500;

/// Configuration for creating a TUN device.
#[derive(Debug, Clone)]
pub struct TunConfig {
    /// Interface name (e.g. "tun0"). `None` lets the platform pick one.
    pub name: Option<String>,
    /// Local address of the interface.
    pub address: Ipv4Addr,
    /// Network prefix length.
    pub prefix_len: u8,
    /// Peer address for point-to-point interfaces.
    pub destination: Option<Ipv4Addr>,
    /// MTU.
    pub mtu: u16,
}

impl TunConfig {
    pub fn builder() -> TunConfigBuilder {
        TunConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix_len > 32 {
            return Err(Error::Config(format!(
                "prefix length {} out of range",
                self.prefix_len
            )));
        }
        if self.mtu < 576 {
            return Err(Error::Config(format!(
                "mtu {} below IPv4 minimum of 576",
                self.mtu
            )));
        }
        Ok(())
    }
}

/// Builder for [`TunConfig`].
#[derive(Debug, Default)]
pub struct TunConfigBuilder {
    name: Option<String>,
    address: Option<Ipv4Addr>,
    prefix_len: u8,
    destination: Option<Ipv4Addr>,
    mtu: Option<u16>,
}

impl TunConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ipv4(mut self, address: Ipv4Addr, prefix_len: u8) -> Self {
        self.address = Some(address);
        self.prefix_len = prefix_len;
        self
    }

    /// Sets the address from a dotted netmask instead of a prefix length.
    pub fn ipv4_with_netmask(mut self, address: Ipv4Addr, netmask: Ipv4Addr) -> Result<Self> {
        self.address = Some(address);
        self.prefix_len = netmask_to_prefix(netmask)?;
        Ok(self)
    }

    pub fn destination(mut self, destination: Ipv4Addr) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn mtu(mut self, mtu: u16) -> Self {
        self.mtu = Some(mtu);
        self
    }

    pub fn build(self) -> Result<TunConfig> {
        let address = self
            .address
            .ok_or_else(|| Error::Config("interface address is required".into()))?;
        let config = TunConfig {
            name: self.name,
            address,
            prefix_len: self.prefix_len,
            destination: self.destination,
            mtu: self.mtu.unwrap_or(DEFAULT_MTU),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Converts a dotted netmask to a prefix length.
///
/// Rejects non-contiguous masks like 255.0.255.0.
pub fn netmask_to_prefix(netmask: Ipv4Addr) -> Result<u8> {
    let bits = u32::from(netmask);
    let prefix = bits.leading_ones();
    if bits != prefix_to_mask_bits(prefix as u8) {
        return Err(Error::InvalidNetmask(format!(
            "{netmask} is not a contiguous netmask"
        )));
    }
    Ok(prefix as u8)
}

/// Converts a prefix length to a dotted netmask.
pub fn prefix_to_netmask(prefix_len: u8) -> Result<Ipv4Addr> {
    if prefix_len > 32 {
        return Err(Error::InvalidNetmask(format!(
            "prefix length {prefix_len} out of range"
        )));
    }
    Ok(Ipv4Addr::from(prefix_to_mask_bits(prefix_len)))
}

fn prefix_to_mask_bits(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len))
    }
}
