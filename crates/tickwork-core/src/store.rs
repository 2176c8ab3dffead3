//! Ordered record storage with secondary indices
//!
//! Records are kept in a `BTreeMap` keyed by their sort key, with two
//! secondary indices:
//! - record key -> sort key (unique lookup)
//! - target -> set of sort keys (all records bound to a target, in order)
//!
//! The insertion index is a per-store counter that restarts at zero whenever
//! a record is inserted into an empty store, so it only has to stay unique
//! among records that coexist.

use crate::error::{Error, Result};
use crate::{Record, TargetId};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Ordered index of records with lookup by key and by target
pub struct OrderedRecordStore<R: Record> {
    /// All records in sort order
    records: BTreeMap<R::Order, R>,
    /// Index: key -> sort key
    by_key: IndexMap<R::Key, R::Order>,
    /// Index: target -> sort keys of its records
    by_target: IndexMap<TargetId, BTreeSet<R::Order>>,
    /// Next insertion index to assign
    next_index: u64,
}

impl<R: Record> OrderedRecordStore<R> {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            by_key: IndexMap::new(),
            by_target: IndexMap::new(),
            next_index: 0,
        }
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the insertion index the next `insert` will assign
    pub fn next_index(&self) -> u64 {
        if self.records.is_empty() {
            0
        } else {
            self.next_index
        }
    }

    /// Insert a record, assigning it the next insertion index
    ///
    /// Fails if a record with the same key is already stored.
    pub fn insert(&mut self, mut record: R) -> Result<R::Order> {
        let key = record.key();
        if self.by_key.contains_key(&key) {
            return Err(Error::AlreadyScheduled(format!("{:?}", key)));
        }

        if self.records.is_empty() {
            self.next_index = 0;
        }
        record.set_insertion_index(self.next_index);
        self.next_index += 1;

        Ok(self.link(record))
    }

    /// Insert a record keeping the insertion index it already carries
    ///
    /// Used for copies of records that live in another store.
    pub fn adopt(&mut self, record: R) -> Result<R::Order> {
        let key = record.key();
        if self.by_key.contains_key(&key) {
            return Err(Error::AlreadyScheduled(format!("{:?}", key)));
        }

        self.next_index = self.next_index.max(record.insertion_index() + 1);
        Ok(self.link(record))
    }

    fn link(&mut self, record: R) -> R::Order {
        let order = record.order();
        self.by_key.insert(record.key(), order);
        self.by_target
            .entry(record.target())
            .or_default()
            .insert(order);
        self.records.insert(order, record);
        order
    }

    /// Remove a record by its sort key
    pub fn remove(&mut self, order: R::Order) -> Option<R> {
        let record = self.records.remove(&order)?;
        self.by_key.swap_remove(&record.key());

        let target = record.target();
        if let Some(orders) = self.by_target.get_mut(&target) {
            orders.remove(&order);
            if orders.is_empty() {
                self.by_target.swap_remove(&target);
            }
        }

        Some(record)
    }

    /// Remove a record by its key
    pub fn remove_by_key(&mut self, key: &R::Key) -> Option<R> {
        let order = self.find_by_key(key)?;
        self.remove(order)
    }

    /// Remove every record, returning them in sort order
    pub fn clear(&mut self) -> Vec<R> {
        self.by_key.clear();
        self.by_target.clear();
        self.next_index = 0;
        std::mem::take(&mut self.records).into_values().collect()
    }

    /// Get a record by sort key
    pub fn get(&self, order: R::Order) -> Option<&R> {
        self.records.get(&order)
    }

    /// Get a mutable record by sort key
    ///
    /// Callers must not change anything `key()`, `target()` or `order()`
    /// depend on.
    pub fn get_mut(&mut self, order: R::Order) -> Option<&mut R> {
        self.records.get_mut(&order)
    }

    /// Find the sort key of a record by its key
    pub fn find_by_key(&self, key: &R::Key) -> Option<R::Order> {
        self.by_key.get(key).copied()
    }

    /// Get a record by its key
    pub fn get_by_key(&self, key: &R::Key) -> Option<&R> {
        self.find_by_key(key).and_then(|order| self.records.get(&order))
    }

    /// Get a mutable record by its key
    pub fn get_by_key_mut(&mut self, key: &R::Key) -> Option<&mut R> {
        let order = self.find_by_key(key)?;
        self.records.get_mut(&order)
    }

    /// Check if a record with this key is stored
    pub fn contains_key(&self, key: &R::Key) -> bool {
        self.by_key.contains_key(key)
    }

    /// Get the sort keys of all records bound to a target, in sort order
    pub fn find_by_target(&self, target: TargetId) -> Vec<R::Order> {
        self.by_target
            .get(&target)
            .map(|orders| orders.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Iterate the records bound to a target, in sort order
    pub fn iter_target(&self, target: TargetId) -> impl Iterator<Item = &R> {
        self.by_target
            .get(&target)
            .into_iter()
            .flat_map(|orders| orders.iter())
            .filter_map(|order| self.records.get(order))
    }

    /// Count the records bound to a target
    pub fn count_for_target(&self, target: TargetId) -> usize {
        self.by_target.get(&target).map_or(0, BTreeSet::len)
    }

    /// Iterate all targets that have at least one record
    pub fn targets(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.by_target.keys().copied()
    }

    /// Iterate all records in sort order
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }
}

impl<R: Record> Default for OrderedRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record + fmt::Debug> fmt::Debug for OrderedRecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedRecordStore")
            .field("records", &self.records)
            .field("next_index", &self.next_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Job;

    fn ids(store: &OrderedRecordStore<Job>) -> Vec<u32> {
        store.iter().map(|job| job.id).collect()
    }

    #[test]
    fn test_insertion_order() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::new(3, 1)).unwrap();
        store.insert(Job::new(1, 2)).unwrap();
        store.insert(Job::new(2, 1)).unwrap();

        assert_eq!(ids(&store), vec![3, 1, 2]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_priority_then_insertion_order() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::with_priority(1, 1, 10)).unwrap();
        store.insert(Job::with_priority(2, 2, -5)).unwrap();
        store.insert(Job::with_priority(3, 3, 10)).unwrap();
        store.insert(Job::with_priority(4, 4, 0)).unwrap();

        assert_eq!(ids(&store), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::new(1, 1)).unwrap();

        let result = store.insert(Job::new(1, 2));
        assert!(matches!(result, Err(Error::AlreadyScheduled(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_key(&1).map(|job| job.target), Some(TargetId(1)));
    }

    #[test]
    fn test_index_resets_when_empty() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::new(1, 1)).unwrap();
        store.insert(Job::new(2, 1)).unwrap();
        assert_eq!(store.next_index(), 2);

        store.remove_by_key(&1);
        store.insert(Job::new(3, 1)).unwrap();
        assert_eq!(store.get_by_key(&3).unwrap().insertion_index, 2);

        store.remove_by_key(&2);
        store.remove_by_key(&3);
        assert!(store.is_empty());
        assert_eq!(store.next_index(), 0);

        store.insert(Job::new(4, 1)).unwrap();
        assert_eq!(store.get_by_key(&4).unwrap().insertion_index, 0);
    }

    #[test]
    fn test_target_index() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::new(1, 10)).unwrap();
        store.insert(Job::new(2, 20)).unwrap();
        store.insert(Job::new(3, 10)).unwrap();

        let for_ten: Vec<_> = store.iter_target(TargetId(10)).map(|job| job.id).collect();
        assert_eq!(for_ten, vec![1, 3]);
        assert_eq!(store.count_for_target(TargetId(10)), 2);
        assert_eq!(store.find_by_target(TargetId(20)).len(), 1);
        assert_eq!(store.count_for_target(TargetId(99)), 0);

        store.remove_by_key(&2);
        let targets: Vec<_> = store.targets().collect();
        assert_eq!(targets, vec![TargetId(10)]);
    }

    #[test]
    fn test_remove_keeps_indices_consistent() {
        let mut store = OrderedRecordStore::new();
        let first = store.insert(Job::new(1, 1)).unwrap();
        store.insert(Job::new(2, 1)).unwrap();

        let removed = store.remove(first).expect("record should be removed");
        assert_eq!(removed.id, 1);
        assert!(store.remove(first).is_none());
        assert!(!store.contains_key(&1));
        assert_eq!(store.find_by_target(TargetId(1)).len(), 1);
    }

    #[test]
    fn test_adopt_keeps_index() {
        let mut store = OrderedRecordStore::new();
        let mut job = Job::new(1, 1);
        job.insertion_index = 41;
        store.adopt(job).unwrap();

        assert_eq!(store.get_by_key(&1).unwrap().insertion_index, 41);
        store.insert(Job::new(2, 1)).unwrap();
        assert_eq!(store.get_by_key(&2).unwrap().insertion_index, 42);
    }

    #[test]
    fn test_clear_returns_in_order() {
        let mut store = OrderedRecordStore::new();
        store.insert(Job::with_priority(1, 1, 5)).unwrap();
        store.insert(Job::with_priority(2, 1, 1)).unwrap();

        let drained: Vec<_> = store.clear().into_iter().map(|job| job.id).collect();
        assert_eq!(drained, vec![2, 1]);
        assert!(store.is_empty());
        assert_eq!(store.targets().count(), 0);
    }
}
