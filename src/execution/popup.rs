use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::models::{Direction, PopupSpec};
use crate::services::PopupHandle;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How a popup left the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupEnd {
    Expired,
    Dismissed,
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupTick {
    Remaining(u32),
    Expired,
}

/// The one live popup and its countdown.
///
/// The countdown timer is the `next_tick` deadline held here: whoever owns the
/// popup waits on it, and dropping the popup drops the timer with it, so a
/// superseded or dismissed popup can never receive another tick.
#[derive(Debug)]
pub struct ActivePopup {
    handle: PopupHandle,
    spec: PopupSpec,
    remaining_secs: u32,
    next_tick: Instant,
}

impl ActivePopup {
    pub fn new(handle: PopupHandle, spec: PopupSpec, now: Instant) -> Self {
        Self {
            handle,
            remaining_secs: spec.timeout_secs,
            spec,
            next_tick: now + TICK_PERIOD,
        }
    }

    pub fn handle(&self) -> PopupHandle {
        self.handle
    }

    pub fn spec(&self) -> &PopupSpec {
        &self.spec
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// When the next tick is due.
    pub fn deadline(&self) -> Instant {
        self.next_tick
    }

    /// Advance the countdown by one period.
    pub fn tick(&mut self) -> PopupTick {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.next_tick += TICK_PERIOD;
        if self.remaining_secs == 0 {
            PopupTick::Expired
        } else {
            PopupTick::Remaining(self.remaining_secs)
        }
    }

    pub fn status(&self) -> PopupStatus {
        PopupStatus {
            pair: self.spec.pair.clone(),
            direction: self.spec.direction,
            win_rate: self.spec.win_rate,
            payout: self.spec.payout,
            remaining_secs: self.remaining_secs,
        }
    }
}

/// Read-only view of the live popup for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupStatus {
    pub pair: String,
    pub direction: Direction,
    pub win_rate: f64,
    pub payout: u32,
    pub remaining_secs: u32,
}
