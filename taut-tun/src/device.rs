//! TUN device wrapper.
//!
//! Thin layer over `tun-rs`: the builder handles the platform details of
//! creating the interface, assigning the address and bringing it up. The
//! device implements [`PacketPort`] so the relay can drive it without
//! knowing it is a TUN.

use async_trait::async_trait;
use taut_protocol::PacketPort;

use crate::config::TunConfig;
use crate::error::{Error, Result};

/// Information about a created TUN device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub mtu: u16,
}

/// An up-and-running TUN interface.
pub struct TunDevice {
    inner: tun_rs::AsyncDevice,
    info: DeviceInfo,
}

impl TunDevice {
    /// Creates and brings up a TUN device.
    ///
    /// Requires root or `CAP_NET_ADMIN` on Linux, root on macOS.
    pub async fn create(config: TunConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = tun_rs::DeviceBuilder::new();
        if let Some(ref name) = config.name {
            builder = builder.name(name);
        }
        builder = builder
            .ipv4(config.address, config.prefix_len, config.destination)
            .mtu(config.mtu);

        let device = builder
            .build_async()
            .map_err(|e| Error::DeviceCreation(e.to_string()))?;
        let name = device
            .name()
            .map_err(|e| Error::DeviceCreation(e.to_string()))?;

        log::info!(
            "created TUN device {} ({}/{}, mtu {})",
            name,
            config.address,
            config.prefix_len,
            config.mtu
        );

        Ok(Self {
            inner: device,
            info: DeviceInfo {
                name,
                mtu: config.mtu,
            },
        })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Reads one IP packet from the interface.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.recv(buf).await.map_err(Error::Io)
    }

    /// Writes one IP packet to the interface.
    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        self.inner.send(buf).await.map_err(Error::Io)
    }
}

#[async_trait]
impl PacketPort for TunDevice {
    async fn read_packet(&self, buf: &mut [u8]) -> taut_protocol::Result<usize> {
        self.inner.recv(buf).await.map_err(map_io_error)
    }

    async fn write_packet(&self, packet: &[u8]) -> taut_protocol::Result<usize> {
        self.inner.send(packet).await.map_err(map_io_error)
    }

    fn mtu(&self) -> u16 {
        self.info.mtu
    }
}

fn map_io_error(e: std::io::Error) -> taut_protocol::Error {
    use std::io::ErrorKind;
    match e.kind() {
        // The fd goes away when the device is torn down.
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => {
            taut_protocol::Error::InterfaceClosed
        }
        _ => taut_protocol::Error::Interface(e.to_string()),
    }
}
