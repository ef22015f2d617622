use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::intelligence::{evaluate, PayoutCache, DEFAULT_MIN_PAYOUT};
use crate::models::{AlertDecision, Direction, FeedEvent, PairPayout, RawSignal, Verdict};
use crate::services::format::{format_alert_line, format_low_win_rate_note, format_skip_line};
use crate::services::{AlertSettings, PopupHandle, Renderer};

use super::popup::{ActivePopup, PopupEnd, PopupStatus, PopupTick};

/// Default minimum backtested win-rate for a popup.
pub const DEFAULT_MIN_POPUP_WIN_RATE: f64 = 55.0;

/// Thresholds for the dispatcher. The payout gate and the popup win-rate
/// gate are independent of each other.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    pub min_payout: u32,
    pub min_popup_win_rate: f64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            min_payout: DEFAULT_MIN_PAYOUT,
            min_popup_win_rate: DEFAULT_MIN_POPUP_WIN_RATE,
        }
    }
}

/// What happened to the popup side of an accepted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Shown(PopupHandle),
    /// Popups switched off by the user.
    Disabled,
    /// Win-rate known but below the popup threshold; a note was logged.
    BelowWinRate,
    /// Win-rate unknown (0); no popup and no note.
    NoWinRate,
    /// Renderer refused the popup; logged and ignored.
    RenderFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub alert_number: u64,
    pub sound_played: bool,
    pub popup: PopupOutcome,
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatcherStatus {
    pub alert_count: u64,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub payout_pairs: usize,
    pub popup: Option<PopupStatus>,
    pub settings: AlertSettings,
}

/// Owns the payout cache, alert counter and the single live popup.
///
/// Every method runs on the control task; nothing here is shared across
/// tasks except the published [`DispatcherStatus`].
pub struct AlertDispatcher<R: Renderer> {
    config: DispatcherConfig,
    settings: AlertSettings,
    cache: PayoutCache,
    renderer: R,
    popup: Option<ActivePopup>,
    alert_count: u64,
    last_alert_at: Option<DateTime<Utc>>,
    status_tx: watch::Sender<DispatcherStatus>,
}

impl<R: Renderer> AlertDispatcher<R> {
    pub fn new(config: DispatcherConfig, settings: AlertSettings, renderer: R) -> Self {
        let settings = settings.sanitized();
        let (status_tx, _) = watch::channel(DispatcherStatus {
            alert_count: 0,
            last_alert_at: None,
            payout_pairs: 0,
            popup: None,
            settings: settings.clone(),
        });
        Self {
            config,
            settings,
            cache: PayoutCache::new(),
            renderer,
            popup: None,
            alert_count: 0,
            last_alert_at: None,
            status_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatcherStatus> {
        self.status_tx.subscribe()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AlertSettings) {
        self.settings = settings.sanitized();
        tracing::info!(
            sound = %self.settings.sound,
            volume = self.settings.volume,
            repeat = self.settings.repeat,
            show_popup = self.settings.show_popup,
            popup_timeout = self.settings.popup_timeout,
            "Alert settings updated"
        );
        self.publish();
    }

    pub fn cache(&self) -> &PayoutCache {
        &self.cache
    }

    pub fn alert_count(&self) -> u64 {
        self.alert_count
    }

    pub fn active_popup(&self) -> Option<&ActivePopup> {
        self.popup.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Deadline of the live popup's next countdown tick, if any.
    pub fn popup_deadline(&self) -> Option<Instant> {
        self.popup.as_ref().map(ActivePopup::deadline)
    }

    /// Route one classified feed frame. Frames are handled strictly in
    /// arrival order, so a payout update is committed before any later
    /// signal reads the cache.
    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::PayoutUpdate(pairs) => self.apply_payout_update(&pairs),
            FeedEvent::Signal(raw) => {
                self.handle_signal(&raw);
            }
        }
    }

    pub fn apply_payout_update(&mut self, pairs: &[PairPayout]) {
        self.cache
            .update(pairs.iter().map(|p| (p.pair.as_str(), p.payout)));
        counter!("payout_updates_total").increment(1);
        gauge!("payout_pairs").set(self.cache.len() as f64);
        tracing::debug!(
            received = pairs.len(),
            cached = self.cache.len(),
            "Payout cache replaced"
        );
        self.publish();
    }

    /// Filter a raw signal against the current cache and act on the result.
    pub fn handle_signal(&mut self, raw: &RawSignal) -> AlertDecision {
        let decision = evaluate(raw, &self.cache, self.config.min_payout);
        match &decision.verdict {
            Verdict::Accepted => {
                self.dispatch(&decision);
            }
            Verdict::Rejected(reason) => {
                counter!("signals_rejected_total", "reason" => reason.label()).increment(1);
                tracing::info!(
                    pair = %decision.pair,
                    direction = %decision.direction,
                    reason = %reason,
                    "{}",
                    format_skip_line(&decision)
                );
            }
        }
        decision
    }

    /// Surface an accepted decision: count it, play the sound, and decide on
    /// a popup.
    pub fn dispatch(&mut self, decision: &AlertDecision) -> DispatchOutcome {
        self.alert_count += 1;
        self.last_alert_at = Some(Utc::now());
        counter!("alerts_total").increment(1);
        tracing::info!(
            alert = self.alert_count,
            pair = %decision.pair,
            direction = %decision.direction,
            win_rate = decision.win_rate,
            payout = decision.payout,
            "{}",
            format_alert_line(self.alert_count, decision)
        );

        let sound_played = match self.renderer.play(
            self.settings.sound,
            self.settings.gain(),
            self.settings.repeat,
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Alert sound failed");
                false
            }
        };

        let popup = self.apply_popup_rule(decision);
        self.publish();

        DispatchOutcome {
            alert_number: self.alert_count,
            sound_played,
            popup,
        }
    }

    fn apply_popup_rule(&mut self, decision: &AlertDecision) -> PopupOutcome {
        if !self.settings.show_popup {
            return PopupOutcome::Disabled;
        }

        let min_wr = self.config.min_popup_win_rate;
        if decision.win_rate >= min_wr && decision.win_rate > 0.0 {
            return self.open_popup(decision);
        }

        if decision.win_rate > 0.0 {
            tracing::info!(
                pair = %decision.pair,
                win_rate = decision.win_rate,
                "{}",
                format_low_win_rate_note(decision.win_rate, min_wr)
            );
            return PopupOutcome::BelowWinRate;
        }

        PopupOutcome::NoWinRate
    }

    /// Replace any live popup with a new one for `decision`.
    fn open_popup(&mut self, decision: &AlertDecision) -> PopupOutcome {
        self.close_popup(PopupEnd::Superseded);

        let spec = decision.popup_spec(self.settings.popup_timeout_secs());
        match self.renderer.show_popup(&spec) {
            Ok(handle) => {
                tracing::debug!(
                    popup = handle.0,
                    pair = %spec.pair,
                    timeout_secs = spec.timeout_secs,
                    "Popup opened"
                );
                self.popup = Some(ActivePopup::new(handle, spec, Instant::now()));
                PopupOutcome::Shown(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, pair = %decision.pair, "Popup failed");
                PopupOutcome::RenderFailed
            }
        }
    }

    /// Tear down the live popup, if any. Returns whether one was closed.
    fn close_popup(&mut self, end: PopupEnd) -> bool {
        let Some(popup) = self.popup.take() else {
            return false;
        };
        self.renderer.dismiss(popup.handle());
        tracing::debug!(
            popup = popup.handle().0,
            pair = %popup.spec().pair,
            remaining_secs = popup.remaining_secs(),
            end = ?end,
            "Popup closed"
        );
        true
    }

    /// Explicit close from the user.
    pub fn dismiss_popup(&mut self) -> bool {
        let closed = self.close_popup(PopupEnd::Dismissed);
        if closed {
            self.publish();
        }
        closed
    }

    /// One countdown period elapsed for the live popup.
    pub fn on_popup_tick(&mut self) {
        let Some(popup) = self.popup.as_mut() else {
            return;
        };
        match popup.tick() {
            PopupTick::Remaining(secs) => {
                let handle = popup.handle();
                self.renderer.update_countdown(handle, secs);
            }
            PopupTick::Expired => {
                self.close_popup(PopupEnd::Expired);
            }
        }
        self.publish();
    }

    /// Play the configured sound once, outside the alert path.
    pub fn test_sound(&mut self) {
        if let Err(e) = self.renderer.play(self.settings.sound, self.settings.gain(), 1) {
            tracing::warn!(error = %e, "Test sound failed");
        }
    }

    /// Push a synthetic accepted alert through the full dispatch path.
    pub fn test_signal(&mut self) -> DispatchOutcome {
        let decision = AlertDecision {
            verdict: Verdict::Accepted,
            pair: "EUR/USD".into(),
            direction: Direction::Buy,
            win_rate: 80.0,
            timeframe: "5".into(),
            expiry_minutes: 6,
            payout: 85,
        };
        self.dispatch(&decision)
    }

    /// Close everything down on exit.
    pub fn shutdown(&mut self) {
        if self.close_popup(PopupEnd::Dismissed) {
            self.publish();
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(DispatcherStatus {
            alert_count: self.alert_count,
            last_alert_at: self.last_alert_at,
            payout_pairs: self.cache.len(),
            popup: self.popup.as_ref().map(ActivePopup::status),
            settings: self.settings.clone(),
        });
    }
}
