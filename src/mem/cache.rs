use std::collections::HashMap;

/// Bounded fully-associative LRU over line addresses, shared by every engine in the
/// design.  Only the projection/reuse window is cacheable; anything else always misses.
/// Eviction scans for the entry with the smallest last-access tick, which is fine at the
/// simulated capacities.
#[derive(Debug)]
pub struct LruCache {
    cycle: u64,
    capacity: usize,
    window_lo: u64,
    window_hi: u64,
    lines: HashMap<u64, u64>,
}

impl LruCache {
    pub fn new(cache_size: u64, cache_line: u64, window_lo: u64, window_hi: u64) -> Self {
        Self {
            cycle: 0,
            capacity: (cache_size / cache_line) as usize,
            window_lo,
            window_hi,
            lines: HashMap::new(),
        }
    }

    pub fn tick(&mut self) {
        self.cycle += 1;
    }

    /// Probe for a line; a hit refreshes its access tick.
    pub fn is_hit(&mut self, address: u64) -> bool {
        match self.lines.get_mut(&address) {
            Some(last) => {
                *last = self.cycle;
                true
            }
            None => false,
        }
    }

    pub fn insert(&mut self, address: u64) {
        if address < self.window_lo || self.window_hi < address {
            return;
        }

        if self.lines.len() < self.capacity {
            self.lines.insert(address, self.cycle);
        } else if self.capacity > 0 {
            let victim = self
                .lines
                .iter()
                .min_by_key(|(_, &tick)| tick)
                .map(|(&addr, _)| addr);
            if let Some(victim) = victim {
                self.lines.remove(&victim);
            }
            self.lines.insert(address, self.cycle);
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_cache(lines: u64) -> LruCache {
        LruCache::new(lines * 64, 64, 0, u64::MAX)
    }

    #[test]
    fn insert_then_hit() {
        let mut cache = open_cache(4);
        assert!(!cache.is_hit(0x100));
        cache.insert(0x100);
        assert!(cache.is_hit(0x100));
    }

    #[test]
    fn capacity_is_bounded() {
        let mut cache = open_cache(3);
        for i in 0..10 {
            cache.insert(i * 64);
            cache.tick();
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn evicts_globally_oldest_entry() {
        let mut cache = open_cache(2);
        cache.insert(0x000);
        cache.tick();
        cache.insert(0x040);
        cache.tick();
        // Touch the older line so the younger one becomes the LRU victim.
        assert!(cache.is_hit(0x000));
        cache.insert(0x080);
        assert!(cache.is_hit(0x000));
        assert!(!cache.is_hit(0x040));
        assert!(cache.is_hit(0x080));
    }

    #[test]
    fn out_of_window_addresses_never_cached() {
        let mut cache = LruCache::new(4 * 64, 64, 0x1000, 0x2000);
        cache.insert(0x0100);
        cache.insert(0x3000);
        assert!(!cache.is_hit(0x0100));
        assert!(!cache.is_hit(0x3000));
        cache.insert(0x1040);
        assert!(cache.is_hit(0x1040));
    }

    #[test]
    fn zero_capacity_cache_never_holds_lines() {
        let mut cache = LruCache::new(0, 64, 0, u64::MAX);
        cache.insert(0x100);
        assert!(cache.is_empty());
        assert!(!cache.is_hit(0x100));
    }
}
