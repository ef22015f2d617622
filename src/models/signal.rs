use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One row of a payout table as sent by the feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PairPayout {
    #[serde(default)]
    pub pair: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub payout: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PayoutTable {
    #[serde(default)]
    pub pairs: Vec<PairPayout>,
}

/// A `div_alert` payload exactly as received. Every field is optional on the
/// wire; missing values fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub alert: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub direction: String,
    /// `None` when the server did not say; only an explicit `false` vetoes.
    #[serde(default, rename = "_server_filtered")]
    pub server_filtered: Option<bool>,
    #[serde(default)]
    pub backtest: Option<Backtest>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Backtest {
    #[serde(default)]
    pub by_time: Option<BacktestByTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BacktestByTime {
    #[serde(default)]
    pub current_best: Option<BestSetup>,
}

/// Best backtested setup for the signal: win-rate, timeframe label and
/// suggested expiry in minutes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BestSetup {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub wr: f64,
    #[serde(default, deserialize_with = "lenient_label")]
    pub tf: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub expiry: u32,
}

impl RawSignal {
    pub fn best_setup(&self) -> Option<&BestSetup> {
        self.backtest
            .as_ref()?
            .by_time
            .as_ref()?
            .current_best
            .as_ref()
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders: the feed sends numbers as either JSON numbers or
// strings depending on the producer.
// ---------------------------------------------------------------------------

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if parsed.is_finite() { parsed } else { 0.0 })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_f64(deserializer)?;
    if value <= 0.0 {
        return Ok(0);
    }
    Ok(value.min(u32::MAX as f64) as u32)
}

fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
