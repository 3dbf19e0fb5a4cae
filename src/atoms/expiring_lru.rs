// 带固定过期时间的 LRU 容器
//
// 每个条目记录创建时间、最近访问时间和绝对过期时间。
// 访问只刷新淘汰顺序，不延长过期时间；容量满时淘汰最久未访问的条目。

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

// 条目的时间信息（只读视图）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTimes {
    pub created_at: Instant,
    pub last_access: Instant,
    pub expires_at: Instant,
}

struct Slot<V> {
    value: V,
    times: EntryTimes,
    tick: u64,
}

pub struct ExpiringLru<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, Slot<V>>,
    // 访问序号 -> 键，序号越小越久未访问
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K, V> ExpiringLru<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // 查找条目；已过期的条目在这里被移除并视为未命中
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = now >= self.entries.get(key)?.times.expires_at;
        if expired {
            self.remove(key);
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        let slot = self.entries.get_mut(key)?;
        if let Some(owned_key) = self.recency.remove(&slot.tick) {
            self.recency.insert(tick, owned_key);
        }
        slot.tick = tick;
        slot.times.last_access = now;
        Some(&slot.value)
    }

    // 插入或替换条目，返回因容量被淘汰的键。
    // 容量满时先清理已过期条目，仍然满才淘汰最久未访问的条目。
    pub fn insert(&mut self, key: K, value: V, now: Instant) -> Option<K> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.recency.remove(&old.tick);
        }

        if self.entries.len() >= self.capacity {
            self.purge_expired(now);
        }
        let evicted = if self.entries.len() >= self.capacity {
            self.evict_least_recent()
        } else {
            None
        };

        self.tick += 1;
        self.recency.insert(self.tick, key.clone());
        self.entries.insert(
            key,
            Slot {
                value,
                times: EntryTimes {
                    created_at: now,
                    last_access: now,
                    expires_at: now + self.ttl,
                },
                tick: self.tick,
            },
        );

        evicted
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot.value)
    }

    pub fn entry_times<Q>(&self, key: &Q) -> Option<EntryTimes>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(|slot| slot.times)
    }

    // 清理所有已过期条目，返回清理数量
    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, slot)| now >= slot.times.expires_at)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn evict_least_recent(&mut self) -> Option<K> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn get_refreshes_recency_but_not_expiry() {
        let start = Instant::now();
        let mut lru = ExpiringLru::new(4, secs(10));
        lru.insert("a", 1, start);

        assert_eq!(lru.get("a", start + secs(5)), Some(&1));
        let times = lru.entry_times("a");
        assert_eq!(times.map(|t| t.last_access), Some(start + secs(5)));
        assert_eq!(times.map(|t| t.expires_at), Some(start + secs(10)));

        assert_eq!(lru.get("a", start + secs(10)), None);
        assert!(lru.is_empty());
    }

    #[test]
    fn overflow_evicts_least_recently_accessed() {
        let now = Instant::now();
        let mut lru = ExpiringLru::new(3, secs(60));
        lru.insert("a", 1, now);
        lru.insert("b", 2, now);
        lru.insert("c", 3, now);

        // a 被访问后，b 成为最久未访问
        lru.get("a", now);
        let evicted = lru.insert("d", 4, now);

        assert_eq!(evicted, Some("b"));
        assert_eq!(lru.len(), 3);
        assert!(lru.entry_times("a").is_some());
        assert!(lru.entry_times("b").is_none());
    }

    #[test]
    fn replacing_a_key_does_not_evict() {
        let now = Instant::now();
        let mut lru = ExpiringLru::new(2, secs(60));
        lru.insert("a", 1, now);
        lru.insert("b", 2, now);

        assert_eq!(lru.insert("a", 10, now), None);
        assert_eq!(lru.len(), 2);
        assert_eq!(lru.get("a", now), Some(&10));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let now = Instant::now();
        let mut lru = ExpiringLru::new(0, secs(60));
        lru.insert("a", 1, now);
        assert!(lru.is_empty());
    }

    #[test]
    fn full_store_drops_expired_entries_before_live_ones() {
        let start = Instant::now();
        let mut lru = ExpiringLru::new(2, secs(10));
        lru.insert("old", 1, start);
        lru.insert("new", 2, start + secs(8));

        // old 已过期，腾出位置后不需要按 LRU 淘汰 new
        assert_eq!(lru.insert("third", 3, start + secs(12)), None);
        assert_eq!(lru.len(), 2);
        assert!(lru.entry_times("old").is_none());
        assert_eq!(lru.get("new", start + secs(12)), Some(&2));
    }
}
