use std::{
    collections::{hash_map, HashMap},
    hash::Hash,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Multiset: key -> number of observations. Zero counts are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter<K: Eq + Hash> {
    counts: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for Counter<K> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Counter<K> {
    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: u64) {
        if n > 0 {
            *self.counts.entry(key).or_insert(0) += n;
        }
    }

    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.counts.contains_key(key)
    }

    /// Removes the key entirely, returning how often it had been counted.
    pub fn remove(&mut self, key: &K) -> u64 {
        self.counts.remove(key).unwrap_or(0)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.counts.retain(|key, _| keep(key));
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, u64> {
        self.counts.keys()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, u64> {
        self.counts.iter()
    }

    pub fn merge(&mut self, other: Counter<K>) {
        for (key, n) in other.counts {
            self.add_n(key, n);
        }
    }
}

impl<K: Eq + Hash + Clone> Counter<K> {
    /// Element-wise sum of several counters.
    pub fn sum<'a>(parts: impl IntoIterator<Item = &'a Counter<K>>) -> Counter<K>
    where
        K: 'a,
    {
        let mut total = Counter::default();
        for part in parts {
            for (key, n) in part.iter() {
                total.add_n(key.clone(), *n);
            }
        }
        total
    }
}

impl<K: Eq + Hash> FromIterator<K> for Counter<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut counter = Counter::default();
        for key in iter {
            counter.add(key);
        }
        counter
    }
}

impl<K: Eq + Hash> Extend<(K, u64)> for Counter<K> {
    fn extend<T: IntoIterator<Item = (K, u64)>>(&mut self, iter: T) {
        for (key, n) in iter {
            self.add_n(key, n);
        }
    }
}

/// Stored as a list of `[key, count]` pairs sorted by key, so that dumps are stable and
/// non-string keys (tuples) survive JSON.
impl<K: Eq + Hash + Ord + Serialize> Serialize for Counter<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&K, &u64)> = self.counts.iter().collect();
        entries.sort_unstable();
        serializer.collect_seq(entries)
    }
}

impl<'de, K: Eq + Hash + Deserialize<'de>> Deserialize<'de> for Counter<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<(K, u64)>::deserialize(deserializer)?;
        let mut counter = Counter::default();
        counter.extend(entries);
        Ok(counter)
    }
}
