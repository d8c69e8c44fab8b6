//! Optional cache of point-in-time balances
//!
//! Entries key on (product, as-of date) and hold Forward balances only, so
//! every entry is recomputable from the ledger alone. Reverse balances hang off
//! the mutable stored quantity and are never cached. Appending a movement
//! dated D drops every cached balance of that product whose as-of date is on
//! or after D.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use shared::{BalanceSnapshot, ProductId, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    product_id: ProductId,
    as_of_date: NaiveDate,
}

#[derive(Debug, Default)]
pub struct BalanceCache {
    entries: RwLock<HashMap<CacheKey, BalanceSnapshot>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product_id: ProductId, as_of_date: NaiveDate) -> Option<BalanceSnapshot> {
        let key = CacheKey {
            product_id,
            as_of_date,
        };
        self.entries.read().ok()?.get(&key).cloned()
    }

    /// Store a bounded Forward balance; anything else is ignored
    pub fn put(&self, snapshot: &BalanceSnapshot) {
        if snapshot.strategy != Strategy::Forward {
            return;
        }
        let Some(as_of_date) = snapshot.as_of_date else {
            return;
        };
        let key = CacheKey {
            product_id: snapshot.product_id,
            as_of_date,
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, snapshot.clone());
        }
    }

    /// Drop balances invalidated by a movement appended on `movement_date`
    pub fn invalidate(&self, product_id: ProductId, movement_date: NaiveDate) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| key.product_id != product_id || key.as_of_date < movement_date);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn cached(cache: &BalanceCache, product_id: ProductId, d: u32) {
        cache.put(&BalanceSnapshot::empty(product_id, Some(day(d))));
    }

    #[test]
    fn test_invalidate_drops_dates_on_or_after_movement() {
        let cache = BalanceCache::new();
        cached(&cache, 1, 4);
        cached(&cache, 1, 5);
        cached(&cache, 1, 9);
        cached(&cache, 2, 9);

        assert_eq!(cache.invalidate(1, day(5)), 2);
        assert!(cache.get(1, day(4)).is_some());
        assert!(cache.get(1, day(5)).is_none());
        assert!(cache.get(1, day(9)).is_none());
        assert!(cache.get(2, day(9)).is_some());
    }

    #[test]
    fn test_unbounded_snapshots_are_not_cached() {
        let cache = BalanceCache::new();
        cache.put(&BalanceSnapshot::empty(1, None));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reverse_snapshots_are_not_cached() {
        let cache = BalanceCache::new();
        let mut snapshot = BalanceSnapshot::empty(1, Some(day(4)));
        snapshot.strategy = Strategy::Reverse;
        cache.put(&snapshot);
        assert!(cache.is_empty());
        assert!(cache.get(1, day(4)).is_none());
    }
}
