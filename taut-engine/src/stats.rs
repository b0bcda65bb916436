//! Traffic counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lock-free counters shared between the pumps and observers.
#[derive(Debug, Default)]
pub struct SharedStats {
    pub bytes_rx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub packets_rx: AtomicU64,
    pub packets_tx: AtomicU64,
}

pub type SharedStatsRef = Arc<SharedStats>;

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record bytes received from the transport
    pub fn record_rx(&self, bytes: usize) {
        self.bytes_rx.fetch_add(bytes as u64, Ordering::Relaxed);
        self.packets_rx.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes sent to the transport
    pub fn record_tx(&self, bytes: usize) {
        self.bytes_tx.fetch_add(bytes as u64, Ordering::Relaxed);
        self.packets_tx.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current stats
    pub fn snapshot(&self) -> RelayStats {
        RelayStats {
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            packets_rx: self.packets_rx.load(Ordering::Relaxed),
            packets_tx: self.packets_tx.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of stats at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub bytes_rx: u64,
    pub bytes_tx: u64,
    pub packets_rx: u64,
    pub packets_tx: u64,
}

impl RelayStats {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_rx + self.bytes_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = SharedStats::new();
        stats.record_tx(100);
        stats.record_tx(50);
        stats.record_rx(30);

        let snap = stats.snapshot();
        assert_eq!(snap.bytes_tx, 150);
        assert_eq!(snap.packets_tx, 2);
        assert_eq!(snap.bytes_rx, 30);
        assert_eq!(snap.packets_rx, 1);
        assert_eq!(snap.total_bytes(), 180);
    }
}
