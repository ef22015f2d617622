use serde::Serialize;
use thiserror::Error;

use super::Direction;

/// Why the signal filter turned a signal down. The `Display` text is what
/// ends up in the `SKIP` log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("not a DIV_FORMING alert ({0})")]
    NotDivergenceForming(String),

    #[error("unsupported pair")]
    UnsupportedPair,

    #[error("server filter veto")]
    ServerFiltered,

    #[error("payout no data < {min}%")]
    NoPayoutData { min: u32 },

    #[error("payout {payout}% < {min}%")]
    PayoutTooLow { payout: u32, min: u32 },
}

impl RejectReason {
    /// Stable label for the `signals_rejected_total` metric.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::NotDivergenceForming(_) => "alert_type",
            RejectReason::UnsupportedPair => "unsupported_pair",
            RejectReason::ServerFiltered => "server_filtered",
            RejectReason::NoPayoutData { .. } => "no_payout_data",
            RejectReason::PayoutTooLow { .. } => "payout_too_low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

/// Output of the signal filter. Carries the normalized view of the signal
/// whether or not it was accepted, so rejections can be logged with pair and
/// direction.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub verdict: Verdict,
    /// Display form, `XXX/YYY` when the symbol is a six-letter pair.
    pub pair: String,
    pub direction: Direction,
    /// Backtested win-rate percentage, 0 when unknown.
    pub win_rate: f64,
    /// Timeframe label in minutes, empty when unknown.
    pub timeframe: String,
    /// Suggested expiry in minutes, 0 when unknown.
    pub expiry_minutes: u32,
    /// Cached payout percentage at evaluation time, 0 when none.
    pub payout: u32,
}

impl AlertDecision {
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match &self.verdict {
            Verdict::Accepted => None,
            Verdict::Rejected(reason) => Some(reason),
        }
    }

    /// The popup this decision would produce, for a given countdown.
    pub fn popup_spec(&self, timeout_secs: u32) -> PopupSpec {
        PopupSpec {
            pair: self.pair.clone(),
            direction: self.direction,
            win_rate: self.win_rate,
            timeframe: self.timeframe.clone(),
            expiry_minutes: self.expiry_minutes,
            payout: self.payout,
            timeout_secs,
        }
    }
}

/// Everything the renderer needs to put a popup on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupSpec {
    pub pair: String,
    pub direction: Direction,
    pub win_rate: f64,
    pub timeframe: String,
    pub expiry_minutes: u32,
    pub payout: u32,
    pub timeout_secs: u32,
}
