use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::execution::{DispatcherConfig, DEFAULT_MIN_POPUP_WIN_RATE};
use crate::ingestion::FeedConfig;
use crate::intelligence::DEFAULT_MIN_PAYOUT;

const DEFAULT_FEED_URL: &str = "ws://46.250.226.38:8085";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Control surface
    pub host: String,
    pub port: u16,
    pub api_token: Option<String>,

    // Feed
    pub feed_url: String,
    pub feed_api_key: String,
    pub reconnect_delay_secs: u64,
    pub read_poll_ms: u64,
    pub auto_connect: bool,

    // Thresholds (independent of each other)
    pub min_payout: u32,
    pub min_popup_win_rate: f64,

    // Files
    pub settings_path: PathBuf,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8086".into())
                .parse()?,
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),

            feed_url: env::var("FEED_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.into()),
            feed_api_key: env::var("FEED_API_KEY")
                .map_err(|_| anyhow::anyhow!("FEED_API_KEY must be set"))?,
            reconnect_delay_secs: env::var("RECONNECT_DELAY_SECS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .unwrap_or(5),
            read_poll_ms: env::var("READ_POLL_MS")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .unwrap_or(1000),
            auto_connect: env::var("AUTO_CONNECT")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),

            min_payout: env::var("MIN_PAYOUT")
                .unwrap_or_else(|_| DEFAULT_MIN_PAYOUT.to_string())
                .parse()
                .unwrap_or(DEFAULT_MIN_PAYOUT),
            min_popup_win_rate: env::var("MIN_POPUP_WIN_RATE")
                .unwrap_or_else(|_| DEFAULT_MIN_POPUP_WIN_RATE.to_string())
                .parse()
                .unwrap_or(DEFAULT_MIN_POPUP_WIN_RATE),

            settings_path: env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| "signal_alert_settings.json".into())
                .into(),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| ".".into()).into(),
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url.clone(),
            api_key: self.feed_api_key.clone(),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            // A zero poll interval would spin.
            poll_interval: Duration::from_millis(self.read_poll_ms.max(10)),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            min_payout: self.min_payout,
            min_popup_win_rate: self.min_popup_win_rate,
        }
    }
}
