//! Open-addressing hash table.
//!
//! Linear probing over a power-of-two capacity, grown at 75% load.
//! Deletion leaves a tombstone (empty key, value `Bool(true)`) so probe
//! sequences running through the deleted slot keep going; tombstones count
//! toward the load factor and are dropped on resize.
//!
//! Two key disciplines share the table: interned strings, compared by
//! handle identity with their content hash cached in the key, and `i32`.

mod sorted;

pub use sorted::SortedTable;

use std::mem::size_of;

use crate::object::ObjRef;
use crate::value::Value;

const MIN_CAPACITY: usize = 8;

/// A table key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Interned string handle and its content hash.
    Str { obj: ObjRef, hash: u32 },
    Int(i32),
}

impl Key {
    #[inline]
    pub fn hash(self) -> u32 {
        match self {
            Key::Str { hash, .. } => hash,
            Key::Int(i) => mix32(i as u32),
        }
    }

    /// Key as a script value.
    pub fn to_value(self) -> Value {
        match self {
            Key::Str { obj, .. } => Value::Obj(obj),
            Key::Int(i) => Value::Int(i),
        }
    }
}

/// Finalizer from MurmurHash3; spreads sequential vnums across buckets.
#[inline]
fn mix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    key: Option<Key>,
    value: Value,
}

impl Entry {
    const EMPTY: Entry = Entry {
        key: None,
        value: Value::Nil,
    };

    const TOMBSTONE: Entry = Entry {
        key: None,
        value: Value::Bool(true),
    };

    #[inline]
    fn is_tombstone(&self) -> bool {
        self.key.is_none() && !self.value.is_nil()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    /// Occupied plus tombstoned slots; drives growth.
    used: usize,
    /// Live keys.
    live: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn heap_size(&self) -> usize {
        self.entries.capacity() * size_of::<Entry>()
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        if self.live == 0 {
            return None;
        }
        let entry = &self.entries[find_slot(&self.entries, key)];
        entry.key.map(|_| entry.value)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite. Returns `true` when `key` was not present.
    pub fn set(&mut self, key: Key, value: Value) -> bool {
        if (self.used + 1) * 4 > self.entries.len() * 3 {
            let capacity = (self.entries.len() * 2).max(MIN_CAPACITY);
            self.resize(capacity);
        }
        let index = find_slot(&self.entries, key);
        let entry = &mut self.entries[index];
        let is_new = entry.key.is_none();
        if is_new {
            self.live += 1;
            // Reusing a tombstone does not change the load.
            if !entry.is_tombstone() {
                self.used += 1;
            }
        }
        *entry = Entry {
            key: Some(key),
            value,
        };
        is_new
    }

    /// Remove `key`, leaving a tombstone. Returns the removed value.
    pub fn delete(&mut self, key: Key) -> Option<Value> {
        if self.live == 0 {
            return None;
        }
        let index = find_slot(&self.entries, key);
        let entry = &mut self.entries[index];
        entry.key?;
        let value = entry.value;
        *entry = Entry::TOMBSTONE;
        self.live -= 1;
        Some(value)
    }

    /// Copy every entry into `to`, overwriting existing keys.
    pub fn add_all(&self, to: &mut Table) {
        for (key, value) in self.iter() {
            to.set(key, value);
        }
    }

    /// Content lookup for interning: find a string key with `hash` for which
    /// `matches` returns true. Stops at the first truly empty slot.
    pub fn find_string(&self, hash: u32, matches: impl Fn(ObjRef) -> bool) -> Option<ObjRef> {
        if self.live == 0 {
            return None;
        }
        let mask = self.entries.len() - 1;
        let mut index = hash as usize & mask;
        loop {
            let entry = &self.entries[index];
            match entry.key {
                None if !entry.is_tombstone() => return None,
                Some(Key::Str { obj, hash: h }) if h == hash && matches(obj) => return Some(obj),
                _ => {}
            }
            index = (index + 1) & mask;
        }
    }

    /// Tombstone every string key for which `keep` returns false. Used to
    /// drop intern entries whose strings the collector is about to free.
    pub fn retain_strings(&mut self, keep: impl Fn(ObjRef) -> bool) -> usize {
        let mut removed = 0;
        for entry in &mut self.entries {
            if let Some(Key::Str { obj, .. }) = entry.key {
                if !keep(obj) {
                    *entry = Entry::TOMBSTONE;
                    removed += 1;
                }
            }
        }
        self.live -= removed;
        removed
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, Value)> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| entry.key.map(|key| (key, entry.value)))
    }

    fn resize(&mut self, capacity: usize) {
        let old = std::mem::replace(&mut self.entries, vec![Entry::EMPTY; capacity]);
        self.used = 0;
        for entry in old {
            if let Some(key) = entry.key {
                let index = find_slot(&self.entries, key);
                self.entries[index] = entry;
                self.used += 1;
            }
        }
        self.live = self.used;
    }
}

/// Slot holding `key`, or the slot an insert of `key` should use: the first
/// tombstone passed, else the empty slot that ended the probe.
fn find_slot(entries: &[Entry], key: Key) -> usize {
    let mask = entries.len() - 1;
    let mut index = key.hash() as usize & mask;
    let mut tombstone = None;
    loop {
        let entry = &entries[index];
        match entry.key {
            Some(k) if k == key => return index,
            Some(_) => {}
            None if entry.is_tombstone() => {
                tombstone.get_or_insert(index);
            }
            None => return tombstone.unwrap_or(index),
        }
        index = (index + 1) & mask;
    }
}
