//! Composable multi-key sorting.
//!
//! Every collection sorts in memory after fetch, and every sort policy
//! is declared through this one builder so the tiebreak chain is
//! explicit at the accessor that owns it. Keys are extracted per
//! comparison; all our keys are cheap (copies or short strings).

use std::cmp::Ordering;

type KeyCompare<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub struct Comparator<T> {
    keys: Vec<KeyCompare<T>>,
}

impl<T> Comparator<T> {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Appends an ascending key. Earlier keys dominate later ones.
    pub fn asc<K, F>(mut self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.keys.push(Box::new(move |a, b| key(a).cmp(&key(b))));
        self
    }

    /// Appends a descending key.
    pub fn desc<K, F>(mut self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.keys.push(Box::new(move |a, b| key(b).cmp(&key(a))));
        self
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        self.keys
            .iter()
            .map(|key| key(a, b))
            .find(|ordering| !ordering.is_eq())
            .unwrap_or(Ordering::Equal)
    }

    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

impl<T> Default for Comparator<T> {
    fn default() -> Self {
        Self::new()
    }
}
