pub mod payout_cache;
pub mod signal_filter;

pub use payout_cache::PayoutCache;
pub use signal_filter::{evaluate, is_supported_pair, normalize_pair, DEFAULT_MIN_PAYOUT, DIV_FORMING};
