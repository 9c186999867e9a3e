//! Media session states, peer connectivity states and quality presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Per-slot media negotiation state.
///
/// Happy path: `Idle → Connecting → AwaitingOffer → Negotiating → Connected`.
/// `Failed` and `Closed` are terminal and reachable from any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaState {
    /// No session has been requested for the slot.
    #[default]
    Idle,
    /// Relay transport is being opened.
    Connecting,
    /// Source URL sent, waiting for the relay's offer.
    AwaitingOffer,
    /// Offer accepted; answer being built and candidates gathered.
    Negotiating,
    /// Peer connectivity established.
    Connected,
    /// Negotiation or transport failed.
    Failed,
    /// Session closed by the user or the peer.
    Closed,
}

impl MediaState {
    /// Returns true for `Failed` and `Closed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Closed)
    }

    /// Returns true while a negotiation is in progress or established.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingOffer | Self::Negotiating | Self::Connected
        )
    }

    /// Returns true if an inbound offer may be accepted in this state.
    pub fn accepts_offer(&self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingOffer)
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingOffer => "awaiting offer",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Transport-level connectivity reported by the peer media primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Checking => "checking",
            Self::Connected => "connected",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// Encoding preset requested from the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityPreset {
    Low,
    #[default]
    MediumLow,
    Medium,
    High,
}

impl QualityPreset {
    /// Wire name of the preset.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::MediumLow => "medium-low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Next preset in `low → medium-low → medium → high → low` order.
    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Low => Self::MediumLow,
            Self::MediumLow => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium-low" => Ok(Self::MediumLow),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::UnknownQuality(other.to_string())),
        }
    }
}
