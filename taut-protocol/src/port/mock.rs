//! In-memory port implementations for tests.
//!
//! These mirror the blocking behavior of the real providers: a read with
//! nothing queued suspends until data is injected or the port is closed,
//! which is exactly what the relay's cancellation paths need to be tested
//! against. Failure injection hooks let tests kill one direction on demand.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::{Error, Result};
use crate::port::{PacketPort, StreamPort};

/// Mock virtual interface backed by packet queues.
pub struct MockPacketPort {
    mtu: u16,
    inbound: Mutex<VecDeque<Vec<u8>>>,
    written: Mutex<Vec<Vec<u8>>>,
    notify: Notify,
    closed: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockPacketPort {
    pub fn new(mtu: u16) -> Self {
        Self {
            mtu,
            inbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Queues a packet for the next `read_packet` call.
    pub async fn inject_packet(&self, packet: Vec<u8>) {
        self.inbound.lock().await.push_back(packet);
        self.notify.notify_waiters();
    }

    /// Closes the interface, unblocking any pending read.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Makes every subsequent `write_packet` fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Release);
    }

    /// Packets written to the interface so far.
    pub async fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().await.clone()
    }
}

impl Default for MockPacketPort {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MTU as u16)
    }
}

#[async_trait]
impl PacketPort for MockPacketPort {
    async fn read_packet(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(packet) = self.inbound.lock().await.pop_front() {
                let n = packet.len();
                if n > buf.len() {
                    return Err(Error::Interface(format!(
                        "packet of {} bytes does not fit buffer of {}",
                        n,
                        buf.len()
                    )));
                }
                buf[..n].copy_from_slice(&packet);
                return Ok(n);
            }
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::InterfaceClosed);
            }

            notified.await;
        }
    }

    async fn write_packet(&self, packet: &[u8]) -> Result<usize> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InterfaceClosed);
        }
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(Error::Interface("injected write failure".into()));
        }
        if packet.len() > self.mtu as usize {
            return Err(Error::Interface(format!(
                "packet of {} bytes exceeds mtu {}",
                packet.len(),
                self.mtu
            )));
        }
        self.written.lock().await.push(packet.to_vec());
        Ok(packet.len())
    }

    fn mtu(&self) -> u16 {
        self.mtu
    }
}

/// Mock byte stream with controllable chunking and failure injection.
pub struct MockStreamPort {
    inbound: Mutex<VecDeque<u8>>,
    written: Mutex<Vec<u8>>,
    notify: Notify,
    closed: AtomicBool,
    fail_next_read: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockStreamPort {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            fail_next_read: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Queues bytes for delivery. Chunk boundaries are not preserved, same
    /// as a real stream.
    pub async fn inject_bytes(&self, bytes: &[u8]) {
        self.inbound.lock().await.extend(bytes.iter().copied());
        self.notify.notify_waiters();
    }

    /// Closes the stream. Buffered bytes are still delivered; after that,
    /// reads fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Makes the next read fail once with a connection error.
    pub fn fail_next_read(&self) {
        self.fail_next_read.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Release);
    }

    /// Everything written to the stream so far, concatenated.
    pub async fn written_bytes(&self) -> Vec<u8> {
        self.written.lock().await.clone()
    }
}

impl Default for MockStreamPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamPort for MockStreamPort {
    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.fail_next_read.swap(false, Ordering::AcqRel) {
                return Err(Error::Connection("injected read failure".into()));
            }
            {
                let mut queue = self.inbound.lock().await;
                if !queue.is_empty() {
                    let n = buf.len().min(queue.len());
                    for slot in buf.iter_mut().take(n) {
                        // Queue length was checked above.
                        match queue.pop_front() {
                            Some(byte) => *slot = byte,
                            None => break,
                        }
                    }
                    return Ok(n);
                }
            }
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::ConnectionClosed);
            }

            notified.await;
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(Error::Connection("injected write failure".into()));
        }
        self.written.lock().await.extend_from_slice(bytes);
        Ok(())
    }
}

/// Builds minimal but valid IPv4 packets for tests.
pub struct Ipv4PacketBuilder {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: u8,
    ttl: u8,
    payload: Vec<u8>,
}

impl Ipv4PacketBuilder {
    pub fn new() -> Self {
        Self {
            src: Ipv4Addr::new(10, 0, 0, 2),
            dst: Ipv4Addr::new(10, 0, 0, 1),
            protocol: 17,
            ttl: 64,
            payload: Vec::new(),
        }
    }

    pub fn src(mut self, addr: Ipv4Addr) -> Self {
        self.src = addr;
        self
    }

    pub fn dst(mut self, addr: Ipv4Addr) -> Self {
        self.dst = addr;
        self
    }

    /// Sets a UDP payload with the given ports.
    pub fn udp(mut self, src_port: u16, dst_port: u16, data: &[u8]) -> Self {
        self.protocol = 17;
        let mut udp = Vec::with_capacity(8 + data.len());
        udp.extend_from_slice(&src_port.to_be_bytes());
        udp.extend_from_slice(&dst_port.to_be_bytes());
        udp.extend_from_slice(&((8 + data.len()) as u16).to_be_bytes());
        udp.extend_from_slice(&[0, 0]); // checksum optional over IPv4
        udp.extend_from_slice(data);
        self.payload = udp;
        self
    }

    pub fn raw_payload(mut self, protocol: u8, data: &[u8]) -> Self {
        self.protocol = protocol;
        self.payload = data.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_len = 20 + self.payload.len();
        let mut packet = Vec::with_capacity(total_len);
        packet.push(0x45); // version 4, IHL 5
        packet.push(0);
        packet.extend_from_slice(&(total_len as u16).to_be_bytes());
        packet.extend_from_slice(&[0, 0]); // identification
        packet.extend_from_slice(&[0x40, 0]); // don't fragment
        packet.push(self.ttl);
        packet.push(self.protocol);
        packet.extend_from_slice(&[0, 0]); // checksum placeholder
        packet.extend_from_slice(&self.src.octets());
        packet.extend_from_slice(&self.dst.octets());

        let checksum = ipv4_checksum(&packet[..20]);
        packet[10..12].copy_from_slice(&checksum.to_be_bytes());

        packet.extend_from_slice(&self.payload);
        packet
    }
}

impl Default for Ipv4PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in header.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum += u32::from(word);
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
