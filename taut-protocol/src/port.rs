//! Port contracts between the relay core and its collaborators.
//!
//! The relay never talks to a TUN device or a TCP socket directly. It drives
//! two narrow async traits, so the core can be exercised end to end against
//! in-memory mocks ([`mock`]) and the concrete providers live in their own
//! crates.

use async_trait::async_trait;

use crate::error::Result;

pub mod mock;

/// A virtual network interface carrying whole IP packets.
///
/// Implementations must be safe to share across tasks: the relay reads from
/// one task and writes from another concurrently.
#[async_trait]
pub trait PacketPort: Send + Sync {
    /// Reads one packet into `buf`, returning its length.
    ///
    /// Waits until a packet is available. Once the interface is closed,
    /// pending and future reads fail with [`Error::InterfaceClosed`]
    /// (queued packets may still be delivered first).
    ///
    /// [`Error::InterfaceClosed`]: crate::Error::InterfaceClosed
    async fn read_packet(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes one packet, returning the number of bytes written.
    async fn write_packet(&self, packet: &[u8]) -> Result<usize>;

    /// MTU of the interface.
    fn mtu(&self) -> u16;
}

/// A connected, reliable, ordered byte stream.
///
/// Message boundaries are not preserved; framing is the caller's job.
#[async_trait]
pub trait StreamPort: Send + Sync {
    /// Reads available bytes into `buf`, returning the count.
    ///
    /// Waits until at least one byte is available. A cleanly closed
    /// connection with no buffered data fails with
    /// [`Error::ConnectionClosed`].
    ///
    /// [`Error::ConnectionClosed`]: crate::Error::ConnectionClosed
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes all of `bytes` to the stream.
    async fn write_all(&self, bytes: &[u8]) -> Result<()>;
}
