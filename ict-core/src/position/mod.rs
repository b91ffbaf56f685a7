//! Position cache: the engine's belief about what's currently open per
//! symbol, refreshed from the exchange and treated as stale after a short
//! TTL so a signal is never sized against data from seconds ago.

use crate::core::types::Position;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default time a cached position is trusted before a caller must refresh
/// it via [`PositionCache::update_from_websocket`] or an explicit query.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

struct Entry {
    position: Option<Position>,
    fetched_at: Instant,
}

/// Concurrent, TTL-bounded cache of open positions.
pub struct PositionCache {
    ttl: Duration,
    entries: DashMap<String, Entry>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, entries: DashMap::new() }
    }

    /// Unconditional read: returns whatever is cached, stale or not, or
    /// `None` if nothing has ever been recorded for this symbol.
    pub fn get(&self, symbol: &str) -> Option<Position> {
        self.entries.get(symbol).and_then(|e| e.position.clone())
    }

    /// Read only if the cached value is within the TTL; `None` both for a
    /// missing entry and for a stale one, forcing the caller to refresh
    /// before trusting it for sizing or risk decisions.
    pub fn get_fresh(&self, symbol: &str) -> Option<Position> {
        let entry = self.entries.get(symbol)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        entry.position.clone()
    }

    pub fn is_stale(&self, symbol: &str) -> bool {
        self.entries
            .get(symbol)
            .map(|e| e.fetched_at.elapsed() > self.ttl)
            .unwrap_or(true)
    }

    /// Update from a websocket position-update event or an explicit
    /// gateway query; resets the freshness clock.
    pub fn update_from_websocket(&self, symbol: &str, position: Option<Position>) {
        self.entries.insert(
            symbol.to_string(),
            Entry { position, fetched_at: Instant::now() },
        );
    }

    /// Drop a symbol's cached entry entirely (e.g. after a confirmed full
    /// close), so the next read is forced to treat it as unknown rather
    /// than stale-but-present.
    pub fn invalidate(&self, symbol: &str) {
        self.entries.remove(symbol);
    }

    pub fn symbols(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for PositionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::helpers::long_position;
    use rust_decimal_macros::dec;

    #[test]
    fn fresh_read_returns_recently_updated_position() {
        let cache = PositionCache::new();
        cache.update_from_websocket("BTCUSDT", Some(long_position("BTCUSDT", dec!(100), dec!(1))));
        assert!(cache.get_fresh("BTCUSDT").is_some());
    }

    #[test]
    fn stale_read_returns_none_past_ttl() {
        let cache = PositionCache::with_ttl(Duration::from_millis(1));
        cache.update_from_websocket("BTCUSDT", Some(long_position("BTCUSDT", dec!(100), dec!(1))));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get_fresh("BTCUSDT").is_none());
        assert!(cache.get("BTCUSDT").is_some());
        assert!(cache.is_stale("BTCUSDT"));
    }

    #[test]
    fn invalidate_removes_the_entry_entirely() {
        let cache = PositionCache::new();
        cache.update_from_websocket("BTCUSDT", Some(long_position("BTCUSDT", dec!(100), dec!(1))));
        cache.invalidate("BTCUSDT");
        assert!(cache.get("BTCUSDT").is_none());
    }
}
