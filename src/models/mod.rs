pub mod alert;
pub mod signal;

pub use alert::{AlertDecision, PopupSpec, RejectReason, Verdict};
pub use signal::{PairPayout, RawSignal};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// `BUY` and `CALL` (any case) are buys; everything else, including an
    /// empty string, reads as a sell.
    pub fn from_feed_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "CALL" => Direction::Buy,
            _ => Direction::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FeedEvent
// ---------------------------------------------------------------------------

/// A classified feed frame, handed from the receive loop to the control task.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Full payout table; replaces the cache wholesale.
    PayoutUpdate(Vec<PairPayout>),
    /// A `div_alert` frame, not yet filtered.
    Signal(RawSignal),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_normalization() {
        assert_eq!(Direction::from_feed_str("BUY"), Direction::Buy);
        assert_eq!(Direction::from_feed_str("call"), Direction::Buy);
        assert_eq!(Direction::from_feed_str("Put"), Direction::Sell);
        assert_eq!(Direction::from_feed_str("SELL"), Direction::Sell);
        assert_eq!(Direction::from_feed_str(""), Direction::Sell);
    }

    #[test]
    fn test_connection_state_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"reconnecting\"");
    }
}
