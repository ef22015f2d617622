use crate::models::{AlertDecision, Direction, RawSignal, RejectReason, Verdict};

use super::payout_cache::PayoutCache;

/// The only alert subtype this client acts on.
pub const DIV_FORMING: &str = "DIV_FORMING";

/// Default minimum cached payout (percent) for a signal to be surfaced.
pub const DEFAULT_MIN_PAYOUT: u32 = 75;

/// The 21 forex pairs the broker offers, in stripped uppercase form.
pub const SUPPORTED_PAIRS: [&str; 21] = [
    "EURUSD", "GBPUSD", "AUDUSD", "USDCHF", "USDCAD", "USDJPY",
    "EURJPY", "GBPJPY", "AUDJPY", "CHFJPY", "CADJPY",
    "EURGBP", "EURCHF", "EURAUD", "EURCAD",
    "GBPCHF", "GBPAUD", "GBPCAD",
    "AUDCHF", "AUDCAD",
    "CADCHF",
];

/// Uppercase and drop slashes and whitespace: `"eur / usd"` → `"EURUSD"`.
pub fn strip_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| *c != '/' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn is_supported_pair(symbol: &str) -> bool {
    let stripped = strip_symbol(symbol);
    SUPPORTED_PAIRS.contains(&stripped.as_str())
}

/// Display form of a pair. Six-letter symbols become `XXX/YYY`; anything
/// else is returned as given.
pub fn normalize_pair(symbol: &str) -> String {
    let stripped = strip_symbol(symbol);
    if stripped.chars().count() == 6 {
        let split = stripped
            .char_indices()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(stripped.len());
        format!("{}/{}", &stripped[..split], &stripped[split..])
    } else {
        symbol.to_string()
    }
}

/// Decide whether a raw `div_alert` is worth surfacing.
///
/// Checks run in a fixed order and the first failure wins:
/// 1. alert subtype must be `DIV_FORMING`
/// 2. symbol must be one of [`SUPPORTED_PAIRS`]
/// 3. an explicit `_server_filtered: false` vetoes
/// 4. cached payout must be at least `min_payout` (no data counts as 0)
///
/// Pure: reads the cache, never mutates anything.
pub fn evaluate(raw: &RawSignal, cache: &PayoutCache, min_payout: u32) -> AlertDecision {
    let pair = normalize_pair(&raw.symbol);
    let direction = Direction::from_feed_str(&raw.direction);
    let payout = cache.lookup(&pair);

    let (win_rate, timeframe, expiry_minutes) = match raw.best_setup() {
        Some(best) => (best.wr, best.tf.clone(), best.expiry),
        None => (0.0, String::new(), 0),
    };

    let verdict = match check(raw, payout, min_payout) {
        Ok(()) => Verdict::Accepted,
        Err(reason) => Verdict::Rejected(reason),
    };

    AlertDecision {
        verdict,
        pair,
        direction,
        win_rate,
        timeframe,
        expiry_minutes,
        payout,
    }
}

fn check(raw: &RawSignal, payout: u32, min_payout: u32) -> Result<(), RejectReason> {
    if raw.alert != DIV_FORMING {
        return Err(RejectReason::NotDivergenceForming(raw.alert.clone()));
    }

    if !is_supported_pair(&raw.symbol) {
        return Err(RejectReason::UnsupportedPair);
    }

    if raw.server_filtered == Some(false) {
        return Err(RejectReason::ServerFiltered);
    }

    if payout < min_payout {
        return Err(if payout == 0 {
            RejectReason::NoPayoutData { min: min_payout }
        } else {
            RejectReason::PayoutTooLow {
                payout,
                min: min_payout,
            }
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
