//! Time-bounded duplicate suppression

use indexmap::IndexMap;
use std::time::{Duration, Instant};

/// Remembers recently alerted keys for a fixed window
///
/// Entries are kept in insertion order and expired from the front. A hit
/// moves the key to the back but keeps its first-seen time, so a refreshed
/// key can outlive its window until everything ahead of it has expired.
#[derive(Debug)]
pub struct DedupCache {
    ttl: Duration,
    seen: IndexMap<String, Instant>,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: IndexMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// True the first time `key` is seen within the window
    pub fn is_new(&mut self, key: &str) -> bool {
        self.is_new_at(key, Instant::now())
    }

    /// [`is_new`](Self::is_new) against an explicit clock
    pub fn is_new_at(&mut self, key: &str, now: Instant) -> bool {
        self.purge(now);

        if let Some(index) = self.seen.get_index_of(key) {
            let last = self.seen.len() - 1;
            self.seen.move_index(index, last);
            return false;
        }

        self.seen.insert(key.to_string(), now);
        true
    }

    fn purge(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.ttl) else {
            return;
        };

        let expired = self
            .seen
            .values()
            .take_while(|first_seen| **first_seen < cutoff)
            .count();
        if expired > 0 {
            self.seen.drain(..expired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sighting_is_new() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(cache.is_new_at("a", t0));
        assert!(!cache.is_new_at("a", t0 + Duration::from_secs(1)));
        assert!(cache.is_new_at("b", t0 + Duration::from_secs(1)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expires_after_ttl() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(cache.is_new_at("a", t0));
        assert!(!cache.is_new_at("a", t0 + Duration::from_secs(30)));
        assert!(cache.is_new_at("a", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_hit_keeps_first_seen_time() {
        let mut cache = DedupCache::new(Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(cache.is_new_at("a", t0));
        assert!(cache.is_new_at("b", t0 + Duration::from_secs(10)));
        // moves "a" behind "b"
        assert!(!cache.is_new_at("a", t0 + Duration::from_secs(20)));

        // "a" is past its window but shielded by the unexpired "b"
        assert!(!cache.is_new_at("a", t0 + Duration::from_secs(65)));

        // once "b" expires the purge reaches "a"
        assert!(cache.is_new_at("a", t0 + Duration::from_secs(71)));
    }

    #[test]
    fn test_purge_drops_expired_prefix() {
        let mut cache = DedupCache::new(Duration::from_secs(5));
        let t0 = Instant::now();

        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            assert!(cache.is_new_at(key, t0 + Duration::from_secs(i as u64)));
        }
        assert!(cache.is_new_at("d", t0 + Duration::from_secs(7)));

        // a (t0) and b (t0+1) are gone; c (t0+2) sits exactly on the cutoff
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_real_clock_expiry() {
        let mut cache = DedupCache::new(Duration::from_millis(50));
        assert!(cache.is_new("x"));
        assert!(!cache.is_new("x"));

        std::thread::sleep(Duration::from_millis(70));
        assert!(cache.is_new("x"));
    }
}
