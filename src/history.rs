// Rolling per-metric history: fixed capacity, oldest evicted one at a time.
// In-memory only; owned by the poll loop for the duration of a session.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::models::MetricKey;

/// Default capacity: 300 samples, about 5 minutes at 1 Hz.
pub const DEFAULT_HISTORY_CAPACITY: usize = 300;

#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    series: HashMap<MetricKey, VecDeque<f64>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl History {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one value; a full series drops exactly its oldest element.
    /// A key seen for the first time starts an empty series (no back-fill).
    pub fn append(&mut self, key: MetricKey, value: f64) {
        let capacity = self.capacity;
        let queue = self
            .series
            .entry(key)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    pub fn extend<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = (MetricKey, f64)>,
    {
        for (key, value) in values {
            self.append(key, value);
        }
    }

    /// Oldest-first values of `key`; empty if the key was never appended.
    pub fn series(&self, key: &MetricKey) -> Vec<f64> {
        self.series
            .get(key)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Copy of every series, ordered by key, for publishing.
    /// Series of vanished devices stay frozen here until the history is dropped.
    pub fn snapshot(&self) -> BTreeMap<MetricKey, Vec<f64>> {
        self.series
            .iter()
            .map(|(k, q)| (k.clone(), q.iter().copied().collect()))
            .collect()
    }
}
