//! Client-side whale trade book: deduplicates the rolling feed by
//! transaction hash across refreshes.
//!
//! The feed endpoint returns a sliding window, so consecutive polls overlap
//! heavily. Absorbing a snapshot inserts only trades whose tx hash has not
//! been seen; the first record for a hash wins and later copies never
//! overwrite it. Trades without a hash cannot be deduplicated and are skipped
//! entirely, as are trades below the notional threshold.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::api::types::WhaleTrade;

pub struct WhaleBook {
    min_trade_size: f64,
    trades: HashMap<String, WhaleTrade>,
}

impl WhaleBook {
    pub fn new(min_trade_size: f64) -> Self {
        WhaleBook {
            min_trade_size,
            trades: HashMap::new(),
        }
    }

    /// Merge one feed refresh into the book. Returns how many trades were
    /// actually new.
    pub fn absorb(&mut self, trades: &[WhaleTrade]) -> usize {
        let mut added = 0;
        for trade in trades {
            let hash = match trade.tx_hash.as_deref() {
                Some(h) if !h.is_empty() => h,
                _ => continue,
            };
            if trade.size < self.min_trade_size {
                continue;
            }
            if !self.trades.contains_key(hash) {
                self.trades.insert(hash.to_string(), trade.clone());
                added += 1;
            }
        }
        if added > 0 {
            debug!("Whale book absorbed {} new trade(s), {} total", added, self.trades.len());
        }
        added
    }

    /// Most recent `n` trades, newest first. Trades with an unparseable
    /// timestamp sort last.
    pub fn recent(&self, n: usize) -> Vec<WhaleTrade> {
        let mut all: Vec<&WhaleTrade> = self.trades.values().collect();
        all.sort_by(|a, b| match (a.observed_at(), b.observed_at()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        all.into_iter().take(n).cloned().collect()
    }

    /// Drop trades older than `max_age` relative to `now`. Trades without a
    /// parseable timestamp are kept. Returns how many were removed.
    pub fn prune(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - max_age;
        let before = self.trades.len();
        self.trades
            .retain(|_, t| t.observed_at().map_or(true, |ts| ts >= cutoff));
        before - self.trades.len()
    }

    /// Total USD notional across the book.
    pub fn total_volume(&self) -> f64 {
        self.trades.values().map(|t| t.size).sum()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::TradeSide;

    fn trade(hash: Option<&str>, size: f64, time: Option<&str>) -> WhaleTrade {
        WhaleTrade {
            tx_hash: hash.map(String::from),
            market: "Will X happen?".to_string(),
            size,
            side: TradeSide::Buy,
            outcome: "Yes".to_string(),
            price: 0.5,
            trader: Some("0xwhale".to_string()),
            time: time.map(String::from),
        }
    }

    #[test]
    fn test_absorb_is_idempotent_across_refreshes() {
        let mut book = WhaleBook::new(5000.0);
        let first = vec![
            trade(Some("0xaaa"), 8000.0, Some("2025-03-01 10:00:00")),
            trade(Some("0xbbb"), 6000.0, Some("2025-03-01 10:05:00")),
        ];
        assert_eq!(book.absorb(&first), 2);

        // Overlapping window on the next poll: same hashes plus one new
        let second = vec![
            trade(Some("0xbbb"), 6000.0, Some("2025-03-01 10:05:00")),
            trade(Some("0xccc"), 12000.0, Some("2025-03-01 10:10:00")),
        ];
        assert_eq!(book.absorb(&second), 1);
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn test_first_record_wins_for_repeated_hash() {
        let mut book = WhaleBook::new(5000.0);
        book.absorb(&[trade(Some("0xaaa"), 8000.0, Some("2025-03-01 10:00:00"))]);
        // A later copy with different fields does not overwrite
        book.absorb(&[trade(Some("0xaaa"), 9999.0, Some("2025-03-01 11:00:00"))]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.recent(1)[0].size, 8000.0);
    }

    #[test]
    fn test_threshold_and_missing_hash_skipped() {
        let mut book = WhaleBook::new(5000.0);
        let added = book.absorb(&[
            trade(Some("0xsmall"), 4999.0, None),
            trade(None, 50000.0, None),
            trade(Some(""), 50000.0, None),
            trade(Some("0xbig"), 5000.0, None),
        ]);
        assert_eq!(added, 1);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_recent_is_newest_first_with_unparseable_last() {
        let mut book = WhaleBook::new(0.0);
        book.absorb(&[
            trade(Some("0xold"), 100.0, Some("2025-03-01 08:00:00")),
            trade(Some("0xnew"), 100.0, Some("2025-03-01 12:00:00")),
            trade(Some("0xnotime"), 100.0, None),
        ]);
        let recent = book.recent(10);
        assert_eq!(recent[0].tx_hash.as_deref(), Some("0xnew"));
        assert_eq!(recent[1].tx_hash.as_deref(), Some("0xold"));
        assert_eq!(recent[2].tx_hash.as_deref(), Some("0xnotime"));
        assert_eq!(book.recent(1).len(), 1);
    }

    #[test]
    fn test_prune_drops_old_keeps_untimestamped() {
        let mut book = WhaleBook::new(0.0);
        book.absorb(&[
            trade(Some("0xancient"), 100.0, Some("2025-02-20 00:00:00")),
            trade(Some("0xfresh"), 100.0, Some("2025-03-01 00:00:00")),
            trade(Some("0xnotime"), 100.0, None),
        ]);
        let now = crate::api::types::parse_timestamp("2025-03-01 12:00:00").unwrap();
        let removed = book.prune(Duration::days(7), now);
        assert_eq!(removed, 1);
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_total_volume() {
        let mut book = WhaleBook::new(0.0);
        book.absorb(&[
            trade(Some("a"), 1000.0, None),
            trade(Some("b"), 2500.0, None),
        ]);
        assert_eq!(book.total_volume(), 3500.0);
    }
}
