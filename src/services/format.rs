use crate::models::{AlertDecision, PopupSpec};

/// Render a win-rate without a trailing `.0` for whole numbers.
fn fmt_win_rate(wr: f64) -> String {
    if wr.fract() == 0.0 {
        format!("{}", wr as i64)
    } else {
        format!("{wr:.1}")
    }
}

/// Alert log line, e.g. `ALERT #3  BUY EUR/USD | WR:80% TF:M5 Exp:6m | Pay:85%`.
/// Only parts with data are shown.
pub fn format_alert_line(alert_number: u64, decision: &AlertDecision) -> String {
    let mut parts = Vec::new();
    if decision.win_rate > 0.0 {
        parts.push(format!("WR:{}%", fmt_win_rate(decision.win_rate)));
    }
    if !decision.timeframe.is_empty() {
        parts.push(format!("TF:M{}", decision.timeframe));
    }
    if decision.expiry_minutes > 0 {
        parts.push(format!("Exp:{}m", decision.expiry_minutes));
    }

    let mut extra = String::new();
    if !parts.is_empty() {
        extra.push_str(" | ");
        extra.push_str(&parts.join(" "));
    }
    if decision.payout > 0 {
        extra.push_str(&format!(" | Pay:{}%", decision.payout));
    }

    format!(
        "ALERT #{}  {} {}{}",
        alert_number, decision.direction, decision.pair, extra
    )
}

/// Skip log line for a rejected decision, e.g.
/// `SKIP SELL GBP/USD - payout no data < 75%`.
pub fn format_skip_line(decision: &AlertDecision) -> String {
    let reason = decision
        .reject_reason()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "accepted".into());
    format!("SKIP {} {} - {}", decision.direction, decision.pair, reason)
}

/// Popup info line: `WR: 80%  |  TF: M5  |  Exp: 6m  |  Payout: 85%`.
pub fn format_popup_info(popup: &PopupSpec) -> String {
    let mut parts = Vec::new();
    if popup.win_rate > 0.0 {
        parts.push(format!("WR: {}%", fmt_win_rate(popup.win_rate)));
    }
    if !popup.timeframe.is_empty() {
        parts.push(format!("TF: M{}", popup.timeframe));
    }
    if popup.expiry_minutes > 0 {
        parts.push(format!("Exp: {}m", popup.expiry_minutes));
    }
    if popup.payout > 0 {
        parts.push(format!("Payout: {}%", popup.payout));
    }
    parts.join("  |  ")
}

/// `Auto-close in 1:59`.
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("Auto-close in {}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

/// Note logged when a popup is withheld for a low but known win-rate.
pub fn format_low_win_rate_note(win_rate: f64, min_win_rate: f64) -> String {
    format!(
        "  (no popup - WR {}% < {}%)",
        fmt_win_rate(win_rate),
        fmt_win_rate(min_win_rate)
    )
}
