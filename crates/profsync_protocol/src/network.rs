//! Network state as reported by the platform's network probe.

use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// The active connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Wi-Fi.
    Wifi,
    /// Cellular data.
    Cellular,
    /// Wired (desktop or emulator).
    Ethernet,
    /// Unknown or not yet reported.
    Unknown,
}

/// Coarse connection quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Barely usable.
    Poor,
    /// Usable with noticeable latency.
    Fair,
    /// Good for most operations.
    Good,
    /// No practical constraint.
    Excellent,
}

impl QualityTier {
    /// Classifies raw probe numbers into a tier.
    #[must_use]
    pub fn from_metrics(bandwidth_kbps: u32, latency_ms: u32) -> Self {
        if bandwidth_kbps >= 10_000 && latency_ms < 50 {
            QualityTier::Excellent
        } else if bandwidth_kbps >= 2_000 && latency_ms < 150 {
            QualityTier::Good
        } else if bandwidth_kbps >= 500 && latency_ms < 500 {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

/// A snapshot of connectivity as last reported by the network probe.
///
/// The engine is a pure consumer of this state; it never queries the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Whether the device is online.
    pub online: bool,
    /// The active connection type.
    pub connection_type: ConnectionType,
    /// Coarse quality bucket.
    pub quality_tier: QualityTier,
    /// Estimated downstream bandwidth.
    pub bandwidth_kbps: u32,
    /// Estimated round-trip latency.
    pub latency_ms: u32,
    /// Last time the device was online.
    pub last_connected_at: Option<Timestamp>,
    /// Whether the platform currently allows background sync.
    pub background_sync_allowed: bool,
}

impl NetworkState {
    /// An offline snapshot, the safe starting assumption.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            online: false,
            connection_type: ConnectionType::Unknown,
            quality_tier: QualityTier::Poor,
            bandwidth_kbps: 0,
            latency_ms: 0,
            last_connected_at: None,
            background_sync_allowed: false,
        }
    }

    /// An online snapshot over the given connection type, with quality
    /// derived from the raw metrics.
    #[must_use]
    pub fn online(connection_type: ConnectionType, bandwidth_kbps: u32, latency_ms: u32) -> Self {
        Self {
            online: true,
            connection_type,
            quality_tier: QualityTier::from_metrics(bandwidth_kbps, latency_ms),
            bandwidth_kbps,
            latency_ms,
            last_connected_at: Some(Timestamp::now()),
            background_sync_allowed: true,
        }
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::offline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_classification() {
        assert_eq!(QualityTier::from_metrics(50_000, 10), QualityTier::Excellent);
        assert_eq!(QualityTier::from_metrics(5_000, 80), QualityTier::Good);
        assert_eq!(QualityTier::from_metrics(800, 300), QualityTier::Fair);
        assert_eq!(QualityTier::from_metrics(100, 900), QualityTier::Poor);
        // High bandwidth does not rescue terrible latency.
        assert_eq!(QualityTier::from_metrics(50_000, 900), QualityTier::Poor);
    }

    #[test]
    fn quality_tiers_order() {
        assert!(QualityTier::Poor < QualityTier::Fair);
        assert!(QualityTier::Fair < QualityTier::Good);
        assert!(QualityTier::Good < QualityTier::Excellent);
    }

    #[test]
    fn snapshots() {
        let off = NetworkState::offline();
        assert!(!off.online);
        assert!(off.last_connected_at.is_none());

        let on = NetworkState::online(ConnectionType::Wifi, 20_000, 20);
        assert!(on.online);
        assert_eq!(on.quality_tier, QualityTier::Excellent);
        assert!(on.last_connected_at.is_some());
    }
}
