use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Key = String;

/// List keyspace. A list is created by the first push to its key, a missing key reads as an empty
/// list.
#[derive(Default)]
pub struct Lists {
    entries: RwLock<HashMap<Key, VecDeque<Bytes>>>,
}

impl Lists {
    /// Inserts each value at the head of the list, one after the other, so the last value ends up
    /// first. Returns the length of the list after the push.
    pub fn lpush(&self, key: Key, values: impl IntoIterator<Item = Bytes>) -> usize {
        let mut entries = self.write();
        let list = entries.entry(key).or_default();

        for value in values {
            list.push_front(value);
        }

        list.len()
    }

    /// Appends the values at the tail of the list, in order. Returns the length of the list after
    /// the push.
    pub fn rpush(&self, key: Key, values: impl IntoIterator<Item = Bytes>) -> usize {
        let mut entries = self.write();
        let list = entries.entry(key).or_default();

        list.extend(values);

        list.len()
    }

    /// Returns the elements between `start` and `stop`, both inclusive. Negative offsets count
    /// from the tail, -1 being the last element. Out of range offsets are clamped to the list.
    pub fn range(&self, key: &str, start: i64, stop: i64) -> Vec<Bytes> {
        let entries = self.read();

        let Some(list) = entries.get(key) else {
            return Vec::new();
        };

        match resolve_range(list.len(), start, stop) {
            Some(range) => list.range(range).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, key: &str) -> usize {
        self.read().get(key).map_or(0, VecDeque::len)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Key, VecDeque<Bytes>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Key, VecDeque<Bytes>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn resolve_range(len: usize, start: i64, stop: i64) -> Option<RangeInclusive<usize>> {
    let len = i64::try_from(len).ok()?;
    if len == 0 {
        return None;
    }

    let start = if start < 0 { len + start } else { start };
    let stop = if stop < 0 { len + stop } else { stop };

    let start = start.max(0);
    let stop = stop.min(len - 1);

    if start > stop {
        return None;
    }

    Some(start as usize..=stop as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(values: &[&str]) -> Vec<Bytes> {
        values
            .iter()
            .map(|value| Bytes::copy_from_slice(value.as_bytes()))
            .collect()
    }

    #[test]
    fn rpush_appends_in_order() {
        let lists = Lists::default();

        assert_eq!(lists.rpush("list".to_string(), bytes(&["a", "b"])), 2);
        assert_eq!(lists.rpush("list".to_string(), bytes(&["c"])), 3);

        assert_eq!(lists.range("list", 0, -1), bytes(&["a", "b", "c"]));
        assert_eq!(lists.len("list"), 3);
    }

    #[test]
    fn lpush_prepends_one_by_one() {
        let lists = Lists::default();

        assert_eq!(lists.rpush("list".to_string(), bytes(&["a"])), 1);
        assert_eq!(lists.lpush("list".to_string(), bytes(&["x", "y"])), 3);

        assert_eq!(lists.range("list", 0, -1), bytes(&["y", "x", "a"]));
    }

    #[test]
    fn missing_key() {
        let lists = Lists::default();

        assert_eq!(lists.len("missing"), 0);
        assert!(lists.range("missing", 0, -1).is_empty());
    }

    #[test]
    fn range() {
        let lists = Lists::default();
        lists.rpush("list".to_string(), bytes(&["a", "b", "c"]));

        assert_eq!(lists.range("list", 0, 0), bytes(&["a"]));
        assert_eq!(lists.range("list", 1, 2), bytes(&["b", "c"]));
        assert_eq!(lists.range("list", -2, -1), bytes(&["b", "c"]));
        assert_eq!(lists.range("list", -100, 100), bytes(&["a", "b", "c"]));
        assert_eq!(lists.range("list", 0, 10), bytes(&["a", "b", "c"]));
        assert!(lists.range("list", 2, 1).is_empty());
        assert!(lists.range("list", 3, 10).is_empty());
        assert!(lists.range("list", 0, -4).is_empty());
        assert!(lists.range("list", -1, -2).is_empty());
    }

    #[test]
    fn resolve_range_bounds() {
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(3, 0, -1), Some(0..=2));
        assert_eq!(resolve_range(3, -100, 100), Some(0..=2));
        assert_eq!(resolve_range(3, i64::MIN, i64::MAX), Some(0..=2));
        assert_eq!(resolve_range(3, 2, 1), None);
    }
}
