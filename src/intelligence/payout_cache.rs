use std::collections::HashMap;
use std::sync::Arc;

use super::signal_filter::normalize_pair;

/// Latest payout percentage per pair.
///
/// Every update swaps in a freshly built table; nothing is merged. A pair
/// missing from the latest update reads as 0 ("no confirmed payout") even if
/// an earlier update carried it. Readers holding a [`snapshot`](Self::snapshot)
/// keep a complete table, never a half-replaced one.
#[derive(Debug, Clone, Default)]
pub struct PayoutCache {
    table: Arc<HashMap<String, u32>>,
}

impl PayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table. Rows with an empty pair or a payout that is
    /// not strictly positive are dropped. Fractional payouts are truncated.
    pub fn update<I, S>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = HashMap::new();
        for (pair, payout) in pairs {
            let pair = pair.as_ref().trim();
            if pair.is_empty() || payout.is_nan() || payout <= 0.0 {
                continue;
            }
            let pct = payout.min(u32::MAX as f64) as u32;
            if pct == 0 {
                continue;
            }
            table.insert(cache_key(pair), pct);
        }
        self.table = Arc::new(table);
    }

    /// Payout for `pair`, or 0 when the latest update did not carry it.
    pub fn lookup(&self, pair: &str) -> u32 {
        self.table.get(&cache_key(pair)).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Shared handle to the current table.
    pub fn snapshot(&self) -> Arc<HashMap<String, u32>> {
        Arc::clone(&self.table)
    }
}

fn cache_key(pair: &str) -> String {
    normalize_pair(pair).to_uppercase()
}
