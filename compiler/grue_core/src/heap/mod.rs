//! The object heap and its mark-sweep collector.
//!
//! Objects live in a slot arena ([`SegVec`]) addressed by [`ObjRef`]
//! handles. Freed slots go on a free list and have their generation bumped,
//! so handles to collected objects fail validation instead of aliasing.
//!
//! # Collection
//!
//! Collection is synchronous and happens inside allocation: when the bytes
//! allocated since the last cycle cross `next_gc` (or on every allocation in
//! stress mode), the heap marks from the caller-supplied roots, the pin list
//! and the object being allocated, then sweeps. Every allocating call takes
//! a `roots: &dyn Trace` argument for this reason.
//!
//! Two slot flags exempt objects from sweeping: [`SlotFlags::PERMANENT`]
//! for strings the runtime holds for its whole life (`init`, builtin names),
//! and [`SlotFlags::HOST_OWNED`] for game entities, which the host frees
//! explicitly with [`Heap::free_host_object`].

mod trace;

pub use trace::{Trace, Tracer};

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use rustc_hash::FxHasher;

use crate::collections::SegVec;
use crate::object::{ObjRef, ObjString, Object};
use crate::table::{Key, Table};
use crate::value::Value;

bitflags! {
    /// Per-slot bookkeeping flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// Never swept.
        const PERMANENT = 1 << 0;
        /// Owned by the host; never swept, freed by `free_host_object`.
        const HOST_OWNED = 1 << 1;
    }
}

#[derive(Debug)]
pub(crate) struct Slot {
    object: Option<Object>,
    generation: u32,
    flags: SlotFlags,
    size: usize,
}

impl Slot {
    /// The live object, if `r` still names it.
    #[inline]
    fn resolve(&self, r: ObjRef) -> Option<&Object> {
        if self.generation == r.generation() {
            self.object.as_ref()
        } else {
            None
        }
    }
}

/// Collector tuning.
#[derive(Clone, Debug)]
pub struct GcConfig {
    /// Bytes allocated before the first collection.
    pub initial_threshold: usize,
    /// Floor for the threshold computed after each collection.
    pub min_threshold: usize,
    /// `next_gc = bytes_allocated * grow_factor` after each collection.
    pub grow_factor: usize,
    /// Collect on every allocation.
    pub stress: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            initial_threshold: 1024 * 1024,
            min_threshold: 1024 * 1024,
            grow_factor: 2,
            stress: false,
        }
    }
}

/// Cumulative collector statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: u64,
    pub objects_freed: u64,
    pub bytes_freed: u64,
    /// Live objects after the most recent collection.
    pub live_objects: usize,
}

/// Misuse of a host-owned handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The handle's object was already freed.
    Stale(ObjRef),
    /// The object is collector-managed and cannot be freed by the host.
    NotHostOwned(ObjRef),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::Stale(r) => write!(
                f,
                "object #{} (generation {}) was already freed",
                r.index(),
                r.generation()
            ),
            HeapError::NotHostOwned(r) => {
                write!(f, "object #{} is not host-owned", r.index())
            }
        }
    }
}

impl std::error::Error for HeapError {}

/// The object heap.
pub struct Heap {
    slots: SegVec<Slot>,
    /// Mark bits, parallel to `slots`.
    marks: Vec<bool>,
    free: Vec<u32>,
    /// Intern table: every live string, keyed by itself.
    strings: Table,
    pinned: Vec<ObjRef>,
    gray: Vec<ObjRef>,
    bytes_allocated: usize,
    next_gc: usize,
    config: GcConfig,
    stats: GcStats,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(GcConfig::default())
    }
}

impl Heap {
    pub fn new(config: GcConfig) -> Self {
        Self {
            slots: SegVec::new(),
            marks: Vec::new(),
            free: Vec::new(),
            strings: Table::new(),
            pinned: Vec::new(),
            gray: Vec::new(),
            bytes_allocated: 0,
            next_gc: config.initial_threshold,
            config,
            stats: GcStats::default(),
        }
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn set_stress(&mut self, stress: bool) {
        self.config.stress = stress;
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn live_objects(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    // ─── Allocation ───

    /// Allocate a collector-managed object, collecting first if due.
    pub fn alloc(&mut self, object: Object, roots: &dyn Trace) -> ObjRef {
        self.maybe_collect(&object, roots);
        self.insert(object, SlotFlags::empty())
    }

    /// Allocate a host-owned object. It is never swept; free it with
    /// [`Heap::free_host_object`].
    pub fn alloc_host(&mut self, object: Object, roots: &dyn Trace) -> ObjRef {
        self.maybe_collect(&object, roots);
        self.insert(object, SlotFlags::HOST_OWNED)
    }

    /// The canonical string object for `s`, allocating it if needed.
    pub fn intern(&mut self, s: &str, roots: &dyn Trace) -> ObjRef {
        let hash = hash_str(s);
        if let Some(existing) = self.lookup(s, hash) {
            return existing;
        }
        let object = Object::String(ObjString::new(s.into(), hash));
        self.maybe_collect(&object, roots);
        let r = self.insert(object, SlotFlags::empty());
        self.strings.set(Key::Str { obj: r, hash }, Value::Nil);
        r
    }

    /// Intern `s` and exempt it from collection for the heap's lifetime.
    /// Never collects, so it needs no roots.
    pub fn intern_permanent(&mut self, s: &str) -> ObjRef {
        let hash = hash_str(s);
        let r = match self.lookup(s, hash) {
            Some(existing) => existing,
            None => {
                let r = self.insert(
                    Object::String(ObjString::new(s.into(), hash)),
                    SlotFlags::empty(),
                );
                self.strings.set(Key::Str { obj: r, hash }, Value::Nil);
                r
            }
        };
        if let Some(slot) = self.slots.get_mut(r.index()) {
            slot.flags |= SlotFlags::PERMANENT;
        }
        r
    }

    /// The interned string equal to `s`, without allocating.
    pub fn find_interned(&self, s: &str) -> Option<ObjRef> {
        self.lookup(s, hash_str(s))
    }

    fn lookup(&self, s: &str, hash: u32) -> Option<ObjRef> {
        let slots = &self.slots;
        self.strings.find_string(hash, |r| {
            slots
                .get(r.index())
                .and_then(|slot| slot.resolve(r))
                .and_then(Object::as_string)
                .is_some_and(|string| string.as_str() == s)
        })
    }

    fn insert(&mut self, object: Object, flags: SlotFlags) -> ObjRef {
        let size = object.heap_size();
        self.bytes_allocated += size;
        if let Some(index) = self.free.pop() {
            let i = index as usize;
            if let Some(slot) = self.slots.get_mut(i) {
                slot.object = Some(object);
                slot.flags = flags;
                slot.size = size;
                return ObjRef::new(index, slot.generation);
            }
        }
        let index = self.slots.push(Slot {
            object: Some(object),
            generation: 0,
            flags,
            size,
        });
        self.marks.push(false);
        let index = u32::try_from(index)
            .unwrap_or_else(|_| panic!("heap slot arena exhausted at {index} objects"));
        ObjRef::new(index, 0)
    }

    // ─── Access ───

    /// The object `r` names, or `None` if it has been freed.
    #[inline]
    pub fn try_get(&self, r: ObjRef) -> Option<&Object> {
        self.slots.get(r.index()).and_then(|slot| slot.resolve(r))
    }

    #[inline]
    pub fn try_get_mut(&mut self, r: ObjRef) -> Option<&mut Object> {
        let slot = self.slots.get_mut(r.index())?;
        if slot.generation == r.generation() {
            slot.object.as_mut()
        } else {
            None
        }
    }

    /// The object `r` names.
    ///
    /// # Panics
    ///
    /// On a stale handle. Reaching one means a root was not reported.
    #[inline]
    pub fn get(&self, r: ObjRef) -> &Object {
        self.try_get(r)
            .unwrap_or_else(|| panic!("stale object handle {r:?}"))
    }

    #[inline]
    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        self.try_get_mut(r)
            .unwrap_or_else(|| panic!("stale object handle {r:?}"))
    }

    pub fn is_live(&self, r: ObjRef) -> bool {
        self.try_get(r).is_some()
    }

    /// Contents of the string `r`, or `None` if it is not a live string.
    pub fn as_str(&self, r: ObjRef) -> Option<&str> {
        self.try_get(r)
            .and_then(Object::as_string)
            .map(ObjString::as_str)
    }

    /// Contents of a string the caller knows to be live.
    ///
    /// # Panics
    ///
    /// If `r` is stale or not a string.
    pub fn str(&self, r: ObjRef) -> &str {
        self.as_str(r)
            .unwrap_or_else(|| panic!("{r:?} is not a live string"))
    }

    /// Table key for the interned string `r`.
    ///
    /// # Panics
    ///
    /// If `r` is stale or not a string.
    pub fn key(&self, r: ObjRef) -> Key {
        match self.try_get(r) {
            Some(Object::String(s)) => Key::Str {
                obj: r,
                hash: s.hash(),
            },
            _ => panic!("{r:?} is not a live string"),
        }
    }

    pub fn flags(&self, r: ObjRef) -> Option<SlotFlags> {
        let slot = self.slots.get(r.index())?;
        slot.resolve(r).map(|_| slot.flags)
    }

    // ─── Pinning ───

    /// Keep `r` alive until a matching [`Heap::unpin`]. Pins nest.
    pub fn pin(&mut self, r: ObjRef) {
        self.pinned.push(r);
    }

    pub fn unpin(&mut self, r: ObjRef) {
        if let Some(pos) = self.pinned.iter().rposition(|&p| p == r) {
            self.pinned.swap_remove(pos);
        }
    }

    // ─── Host objects ───

    /// Free a host-owned object. A second free of the same handle is
    /// reported as [`HeapError::Stale`].
    pub fn free_host_object(&mut self, r: ObjRef) -> Result<(), HeapError> {
        let flags = self.flags(r).ok_or(HeapError::Stale(r))?;
        if !flags.contains(SlotFlags::HOST_OWNED) {
            return Err(HeapError::NotHostOwned(r));
        }
        self.release(r.index());
        tracing::trace!(index = r.index(), "freed host object");
        Ok(())
    }

    // ─── Collection ───

    fn maybe_collect(&mut self, incoming: &Object, roots: &dyn Trace) {
        let due = self.bytes_allocated + incoming.heap_size() > self.next_gc;
        if self.config.stress || due {
            self.collect(&(roots, incoming));
        }
    }

    /// Run a full collection. Everything not reachable from `roots` or the
    /// pin list is reclaimed.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn collect(&mut self, roots: &dyn Trace) {
        let before = self.bytes_allocated;

        let mut tracer = Tracer::new(&self.slots, &mut self.marks, &mut self.gray);
        roots.trace(&mut tracer);
        for &r in &self.pinned {
            tracer.mark(r);
        }
        tracer.drain();
        self.mark_orphaned_host_objects();

        let slots = &self.slots;
        let marks = &self.marks;
        self.strings.retain_strings(|r| {
            marks[r.index()]
                || slots
                    .get(r.index())
                    .is_some_and(|slot| slot.flags.contains(SlotFlags::PERMANENT))
        });

        let (objects, bytes) = self.sweep();
        self.marks.fill(false);

        self.next_gc = (self.bytes_allocated * self.config.grow_factor).max(self.config.min_threshold);
        self.stats.collections += 1;
        self.stats.objects_freed += objects;
        self.stats.bytes_freed += bytes as u64;
        self.stats.live_objects = self.live_objects();

        tracing::debug!(
            before,
            after = self.bytes_allocated,
            freed = objects,
            live = self.stats.live_objects,
            next_gc = self.next_gc,
            "collected"
        );
    }

    /// Host objects the root hook did not reach are still traced so their
    /// fields survive, but the miss is reported.
    fn mark_orphaned_host_objects(&mut self) {
        let mut orphans = Vec::new();
        for index in 0..self.slots.len() {
            if self.marks[index] {
                continue;
            }
            if let Some(slot) = self.slots.get(index) {
                if slot.object.is_some() && slot.flags.contains(SlotFlags::HOST_OWNED) {
                    orphans.push(ObjRef::new(index as u32, slot.generation));
                }
            }
        }
        if orphans.is_empty() {
            return;
        }
        tracing::warn!(
            count = orphans.len(),
            "host-owned objects not reported by the root hook"
        );
        let mut tracer = Tracer::new(&self.slots, &mut self.marks, &mut self.gray);
        for r in orphans {
            tracer.mark(r);
        }
        tracer.drain();
    }

    fn sweep(&mut self) -> (u64, usize) {
        let mut objects = 0;
        let mut bytes = 0;
        for index in 0..self.slots.len() {
            if self.marks[index] {
                continue;
            }
            let Some(slot) = self.slots.get(index) else {
                continue;
            };
            if slot.object.is_none()
                || slot.flags.intersects(SlotFlags::PERMANENT | SlotFlags::HOST_OWNED)
            {
                continue;
            }
            bytes += slot.size;
            objects += 1;
            self.release(index);
        }
        (objects, bytes)
    }

    fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.object = None;
            slot.flags = SlotFlags::empty();
            slot.generation = slot.generation.wrapping_add(1);
            self.bytes_allocated = self.bytes_allocated.saturating_sub(slot.size);
            slot.size = 0;
            self.free.push(index as u32);
        }
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("live_objects", &self.live_objects())
            .field("bytes_allocated", &self.bytes_allocated)
            .field("next_gc", &self.next_gc)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Content hash of a string, folded to 32 bits.
pub fn hash_str(s: &str) -> u32 {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as u32
}
