//! The relay core: two forwarding pumps over one session.
//!
//! The outbound pump reads packets from the virtual interface, encrypts and
//! frames them, and writes them to the transport. The inbound pump
//! accumulates transport bytes, cuts them into frames, decrypts and writes
//! the packets to the interface. The pumps are independent tasks but share
//! one fate: the first error (or a shutdown request) tears both down and
//! ends the session.
//!
//! A decryption or framing failure is fatal by policy. The cipher carries no
//! integrity tag, so after one bad frame the receiver cannot prove it is
//! still aligned with the sender's frame boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use taut_protocol::{Cipher, Frame, PacketPort, StreamPort, IFACE_BUFSIZE};
use taut_tun::{TunConfig, TunDevice};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::event::{EventHandler, LoggingEventHandler, RelayEvent};
use crate::session::{Session, SessionState};
use crate::socket;
use crate::stats::{RelayStats, SharedStats, SharedStatsRef};

/// Which pump an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Interface to transport
    Outbound,
    /// Transport to interface
    Inbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Outbound => write!(f, "interface-to-transport"),
            Direction::Inbound => write!(f, "transport-to-interface"),
        }
    }
}

/// An encrypted tunnel relay session.
///
/// One-shot: a relay runs a single session from `Idle` to a terminal
/// `Closed` or `Failed`. Reconnection is the caller's policy; construct a
/// new relay for a new attempt.
pub struct Relay {
    config: Config,
    cipher: Cipher,
    session: Session,
    shutdown_tx: broadcast::Sender<()>,
    // Latched so a shutdown requested before the pumps subscribe to the
    // broadcast is not lost.
    shutdown_requested: AtomicBool,
    event_handler: Arc<dyn EventHandler>,
    stats: SharedStatsRef,
}

impl Relay {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let cipher = Cipher::new(config.tunnel.key.as_bytes());
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            cipher,
            session: Session::new(),
            shutdown_tx,
            shutdown_requested: AtomicBool::new(false),
            event_handler: Arc::new(LoggingEventHandler),
            stats: Arc::new(SharedStats::new()),
        })
    }

    /// Replaces the default logging event handler.
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// A receiver observing every session state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Snapshot of the traffic counters.
    pub fn stats(&self) -> RelayStats {
        self.stats.snapshot()
    }

    /// Requests a graceful shutdown. Unblocks both pumps promptly; the
    /// session moves through `Closing` to `Closed`.
    pub fn shutdown(&self) {
        log::info!("shutdown requested");
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Provisions the TUN device and the server connection, then runs the
    /// session to completion. Provisioning failures are surfaced without
    /// retry.
    pub async fn connect(&self) -> Result<()> {
        self.transition_to_connecting().await?;
        if self.shutdown_requested.load(Ordering::Acquire) {
            return self.close_before_connected().await;
        }

        let tun = match self.provision_tun().await {
            Ok(device) => Arc::new(device) as Arc<dyn PacketPort>,
            Err(e) => return self.fail_provisioning(e).await,
        };
        let stream = match socket::connect(&self.config.server).await {
            Ok(port) => Arc::new(port) as Arc<dyn StreamPort>,
            Err(e) => return self.fail_provisioning(e).await,
        };

        self.run_pumps(tun, stream).await
    }

    /// Runs the session over already-provisioned ports. This is the whole
    /// relay behind injectable collaborators; `connect` is a thin layer on
    /// top of it.
    pub async fn run_with_ports(
        &self,
        tun: Arc<dyn PacketPort>,
        stream: Arc<dyn StreamPort>,
    ) -> Result<()> {
        self.transition_to_connecting().await?;
        self.run_pumps(tun, stream).await
    }

    async fn provision_tun(&self) -> Result<TunDevice> {
        let mut builder = TunConfig::builder()
            .ipv4_with_netmask(self.config.tunnel.address, self.config.tunnel.netmask)
            .map_err(|e| Error::Provision(e.to_string()))?
            .mtu(self.config.tunnel.mtu);
        if let Some(ref name) = self.config.tunnel.device {
            builder = builder.name(name);
        }
        let tun_config = builder
            .build()
            .map_err(|e| Error::Provision(e.to_string()))?;

        TunDevice::create(tun_config).await.map_err(|e| {
            if e.is_permission_denied() {
                log::error!("creating a TUN device requires root or CAP_NET_ADMIN");
            }
            Error::Provision(format!("failed to create tun device: {}", e))
        })
    }

    async fn fail_provisioning(&self, e: Error) -> Result<()> {
        log::error!("provisioning failed: {}", e);
        self.session.fail();
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Connecting,
            new: SessionState::Failed,
        })
        .await;
        self.emit(RelayEvent::Error {
            message: e.to_string(),
        })
        .await;
        Err(e)
    }

    /// Winds a session that never reached Connected down to Closed, for a
    /// shutdown that arrived before or during provisioning.
    async fn close_before_connected(&self) -> Result<()> {
        self.session.begin_close();
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Connecting,
            new: SessionState::Closing,
        })
        .await;
        self.session.finish_close();
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Closing,
            new: SessionState::Closed,
        })
        .await;
        self.emit(RelayEvent::Disconnected {
            reason: "shutdown requested".into(),
        })
        .await;
        Ok(())
    }

    async fn transition_to_connecting(&self) -> Result<()> {
        self.session.start_connecting()?;
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Idle,
            new: SessionState::Connecting,
        })
        .await;
        Ok(())
    }

    async fn run_pumps(
        &self,
        tun: Arc<dyn PacketPort>,
        stream: Arc<dyn StreamPort>,
    ) -> Result<()> {
        // Subscribe before publishing Connected so a shutdown requested
        // right after the state change cannot be lost.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.shutdown_requested.load(Ordering::Acquire) {
            return self.close_before_connected().await;
        }

        self.session.mark_connected()?;
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Connecting,
            new: SessionState::Connected,
        })
        .await;
        self.emit(RelayEvent::Connected {
            tunnel_ip: self.config.tunnel.address,
            peer: self.config.server.to_string(),
        })
        .await;

        let mut outbound = tokio::spawn(outbound_pump(
            tun.clone(),
            stream.clone(),
            self.cipher.clone(),
            self.stats.clone(),
        ));
        let mut inbound = tokio::spawn(inbound_pump(
            tun.clone(),
            stream.clone(),
            self.cipher.clone(),
            self.stats.clone(),
        ));

        // First exit wins; `done` remembers which handle already completed
        // so it is not awaited twice below.
        let (result, done) = tokio::select! {
            res = &mut outbound => (pump_result(res, Direction::Outbound), Some(Direction::Outbound)),
            res = &mut inbound => (pump_result(res, Direction::Inbound), Some(Direction::Inbound)),
            _ = shutdown_rx.recv() => (Ok(()), None),
        };

        self.session.begin_close();
        self.emit(RelayEvent::StateChanged {
            old: SessionState::Connected,
            new: SessionState::Closing,
        })
        .await;

        if done != Some(Direction::Outbound) {
            outbound.abort();
            let _ = outbound.await;
        }
        if done != Some(Direction::Inbound) {
            inbound.abort();
            let _ = inbound.await;
        }
        drop(tun);
        drop(stream);

        match result {
            Ok(()) => {
                self.session.finish_close();
                self.emit(RelayEvent::StateChanged {
                    old: SessionState::Closing,
                    new: SessionState::Closed,
                })
                .await;
                self.emit(RelayEvent::Disconnected {
                    reason: "shutdown requested".into(),
                })
                .await;
                Ok(())
            }
            Err(e) => {
                log::error!("session failed: {}", e);
                self.session.fail();
                self.emit(RelayEvent::StateChanged {
                    old: SessionState::Closing,
                    new: SessionState::Failed,
                })
                .await;
                self.emit(RelayEvent::Error {
                    message: e.to_string(),
                })
                .await;
                self.emit(RelayEvent::Disconnected {
                    reason: e.to_string(),
                })
                .await;
                Err(e)
            }
        }
    }

    async fn emit(&self, event: RelayEvent) {
        self.event_handler.on_event(event).await;
    }
}

fn pump_result(
    res: std::result::Result<Result<()>, tokio::task::JoinError>,
    direction: Direction,
) -> Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.in_direction(direction)),
        Err(e) => Err(Error::Task(e.to_string()).in_direction(direction)),
    }
}

/// Interface to transport: read packet, encrypt, frame, send.
async fn outbound_pump(
    tun: Arc<dyn PacketPort>,
    stream: Arc<dyn StreamPort>,
    cipher: Cipher,
    stats: SharedStatsRef,
) -> Result<()> {
    // The buffer must hold whatever the interface can hand us, so it is
    // sized from the port's MTU, not assumed.
    let mut buf = vec![0u8; (tun.mtu() as usize).max(IFACE_BUFSIZE)];
    loop {
        let n = tun.read_packet(&mut buf).await?;
        if n == 0 {
            continue;
        }
        let frame = cipher.encrypt(&buf[..n])?;
        let encoded = frame.encode();
        stream.write_all(&encoded).await?;
        stats.record_tx(encoded.len());
        log::trace!("relayed {} byte packet out ({} bytes on wire)", n, encoded.len());
    }
}

/// Transport to interface: accumulate bytes, cut frames, decrypt, deliver.
///
/// No bytes are consumed until a whole frame is buffered, so arbitrary read
/// chunk boundaries are fine. A stream that ends mid-frame is reported as a
/// framing error rather than a plain close.
async fn inbound_pump(
    tun: Arc<dyn PacketPort>,
    stream: Arc<dyn StreamPort>,
    cipher: Cipher,
    stats: SharedStatsRef,
) -> Result<()> {
    let mut chunk = vec![0u8; IFACE_BUFSIZE];
    let mut rxbuf: Vec<u8> = Vec::with_capacity(2 * IFACE_BUFSIZE);
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) if e.is_closed() && !rxbuf.is_empty() => {
                log::warn!("connection ended with a {} byte partial frame", rxbuf.len());
                return Err(taut_protocol::Error::FrameTooShort {
                    expected: Frame::required_len(&rxbuf),
                    actual: rxbuf.len(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        rxbuf.extend_from_slice(&chunk[..n]);

        while let Some((frame, used)) = Frame::decode_next(&rxbuf)? {
            rxbuf.drain(..used);
            let packet = cipher.decrypt(&frame)?;
            tun.write_packet(&packet).await?;
            stats.record_rx(used);
            log::trace!("relayed {} byte packet in ({} bytes on wire)", packet.len(), used);
        }
    }
}
