use super::{Key, Table};
use crate::value::Value;

/// An integer-keyed table that also iterates in ascending key order.
///
/// Lookups go through the hash table; a sorted key vector, maintained by
/// binary-search insertion, gives ordered traversal. Used for vnum-indexed
/// registries where listings must come out sorted.
#[derive(Clone, Debug, Default)]
pub struct SortedTable {
    table: Table,
    order: Vec<i32>,
}

impl SortedTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: i32) -> Option<Value> {
        self.table.get(Key::Int(key))
    }

    /// Insert or overwrite. Returns `true` when `key` was not present.
    pub fn insert(&mut self, key: i32, value: Value) -> bool {
        let is_new = self.table.set(Key::Int(key), value);
        if is_new {
            if let Err(pos) = self.order.binary_search(&key) {
                self.order.insert(pos, key);
            }
        }
        is_new
    }

    pub fn remove(&mut self, key: i32) -> Option<Value> {
        let value = self.table.delete(Key::Int(key))?;
        if let Ok(pos) = self.order.binary_search(&key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> &[i32] {
        &self.order
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, Value)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.table.get(Key::Int(key)).map(|value| (key, value)))
    }

    pub(crate) fn table(&self) -> &Table {
        &self.table
    }

    pub fn heap_size(&self) -> usize {
        self.table.heap_size() + self.order.capacity() * std::mem::size_of::<i32>()
    }
}
