//! Open-addressing property table with copy-on-write sharing.
//!
//! Keys, values, flags and watch handlers live in parallel vectors indexed by
//! `hash(key) & mask`, probed linearly. A deleted entry keeps its key and
//! drops its value (a tombstone), so probing continues past it. Whole
//! tables can be shared between a realm object and its clones: sharing
//! marks both sides [`CopyState::CopyOnWrite`], and the first structural
//! mutation on either side deep-copies the backing vectors.

use std::hash::{Hash, Hasher};
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::value::{CheapClone, JsString, JsValue};

const INITIAL_CAPACITY: usize = 16;

/// Per-slot attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyFlags(u8);

impl PropertyFlags {
    pub const EMPTY: Self = Self(0);
    pub const READ_ONLY: Self = Self(1 << 0);
    pub const DONT_ENUM: Self = Self(1 << 1);
    pub const DONT_DELETE: Self = Self(1 << 2);
    pub const WATCHED: Self = Self(1 << 3);

    /// Attributes of built-in methods
    pub const HIDDEN: Self = Self(Self::DONT_ENUM.0);
    /// Attributes of built-in constants such as `Math.PI`
    pub const CONSTANT: Self = Self(Self::READ_ONLY.0 | Self::DONT_ENUM.0 | Self::DONT_DELETE.0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY)
    }

    pub const fn is_enumerable(self) -> bool {
        !self.contains(Self::DONT_ENUM)
    }

    pub const fn is_deletable(self) -> bool {
        !self.contains(Self::DONT_DELETE)
    }
}

impl BitOr for PropertyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// Whether mutating a table must first copy its backing vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    /// Privately owned and already modified
    Dirty,
    /// Finalized template; the next write just marks it dirty
    Clean,
    /// Backing vectors are shared with a clone sibling
    CopyOnWrite,
}

/// Result of a plain (non-defining) write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Inserted,
    Updated,
    /// The slot is read-only; nothing was written
    ReadOnly,
}

#[derive(Clone)]
struct Slots {
    names: Vec<Option<JsString>>,
    values: Vec<Option<JsValue>>,
    flags: Vec<PropertyFlags>,
    /// Empty until the first `watch`
    watchers: Vec<Option<JsValue>>,
    size: usize,
    fill: usize,
}

impl Slots {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            names: vec![None; capacity],
            values: vec![None; capacity],
            flags: vec![PropertyFlags::EMPTY; capacity],
            watchers: Vec::new(),
            size: 0,
            fill: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.names.len()
    }

    fn mask(&self) -> usize {
        self.capacity() - 1
    }

    /// `Ok(slot)` when `key` owns a slot (live or tombstone),
    /// `Err(slot)` with the empty slot that ends the probe otherwise.
    fn probe(&self, key: &str) -> Result<usize, usize> {
        let mask = self.mask();
        let mut index = hash_key(key) & mask;
        loop {
            match self.names.get(index) {
                Some(Some(name)) if name.as_str() == key => return Ok(index),
                Some(Some(_)) => index = (index + 1) & mask,
                _ => return Err(index),
            }
        }
    }

    fn is_live(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    fn is_watched(&self, index: usize) -> bool {
        self.flags
            .get(index)
            .is_some_and(|f| f.contains(PropertyFlags::WATCHED))
    }

    fn watcher(&self, index: usize) -> Option<&JsValue> {
        self.watchers.get(index).and_then(Option::as_ref)
    }

    /// Rebuild at `capacity`, dropping tombstones that are not watched.
    fn rebuild(&self, capacity: usize) -> Slots {
        let mut next = Slots::with_capacity(capacity);
        if !self.watchers.is_empty() {
            next.watchers = vec![None; capacity];
        }
        for index in 0..self.capacity() {
            let Some(Some(name)) = self.names.get(index) else {
                continue;
            };
            if !self.is_live(index) && !self.is_watched(index) {
                continue;
            }
            let Err(slot) = next.probe(name.as_str()) else {
                continue;
            };
            next.names[slot] = Some(name.cheap_clone());
            next.values[slot] = self.values[index].clone();
            next.flags[slot] = self.flags[index];
            if let Some(watcher) = self.watcher(index) {
                next.watchers[slot] = Some(watcher.clone());
            }
            next.fill += 1;
            if next.is_live(slot) {
                next.size += 1;
            }
        }
        next
    }

    /// Make room for one more key, growing or compacting as needed.
    fn reserve_one(&mut self) {
        let capacity = self.capacity();
        if capacity <= 4 * (self.size + 1) {
            tracing::trace!(from = capacity, to = capacity * 4, "property table grow");
            *self = self.rebuild(capacity * 4);
        } else if capacity <= 2 * (self.fill + 1) {
            tracing::trace!(capacity, fill = self.fill, "property table refill");
            *self = self.rebuild(capacity);
        }
    }

    /// Slot for `key`, claiming an empty one if needed.
    fn claim(&mut self, key: &JsString) -> usize {
        match self.probe(key.as_str()) {
            Ok(index) => index,
            Err(_) => {
                self.reserve_one();
                match self.probe(key.as_str()) {
                    Ok(index) | Err(index) => {
                        self.names[index] = Some(key.cheap_clone());
                        self.flags[index] = PropertyFlags::EMPTY;
                        self.fill += 1;
                        index
                    }
                }
            }
        }
    }

    fn store(&mut self, index: usize, value: JsValue) -> SetOutcome {
        let was_live = self.is_live(index);
        self.values[index] = Some(value);
        if was_live {
            SetOutcome::Updated
        } else {
            self.size += 1;
            SetOutcome::Inserted
        }
    }
}

fn hash_key(key: &str) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish() as usize
}

/// Property storage owned by one object
pub struct PropertyTable {
    slots: Arc<Slots>,
    copy_state: CopyState,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Capacity is rounded up to a power of two, at least 16.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(INITIAL_CAPACITY).next_power_of_two();
        Self {
            slots: Arc::new(Slots::with_capacity(capacity)),
            copy_state: CopyState::Dirty,
        }
    }

    /// Number of live properties
    pub fn len(&self) -> usize {
        self.slots.size
    }

    pub fn is_empty(&self) -> bool {
        self.slots.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Occupied slots, tombstones included
    pub fn fill(&self) -> usize {
        self.slots.fill
    }

    pub fn copy_state(&self) -> CopyState {
        self.copy_state
    }

    /// Mark a finalized template table.
    pub fn set_clean(&mut self) {
        if self.copy_state == CopyState::Dirty {
            self.copy_state = CopyState::Clean;
        }
    }

    /// Produce a table for a clone of the owning object.
    ///
    /// Clean or already-shared tables hand out their backing storage and
    /// both sides become copy-on-write. A dirty table is copied eagerly.
    pub fn share(&mut self) -> PropertyTable {
        match self.copy_state {
            CopyState::Dirty => PropertyTable {
                slots: Arc::new(Slots::clone(&self.slots)),
                copy_state: CopyState::Dirty,
            },
            CopyState::Clean | CopyState::CopyOnWrite => {
                self.copy_state = CopyState::CopyOnWrite;
                PropertyTable {
                    slots: Arc::clone(&self.slots),
                    copy_state: CopyState::CopyOnWrite,
                }
            }
        }
    }

    /// Whether both tables currently read from the same backing storage
    pub fn shares_storage_with(&self, other: &PropertyTable) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }

    fn slots_mut(&mut self) -> &mut Slots {
        match self.copy_state {
            CopyState::Dirty => {}
            CopyState::Clean => self.copy_state = CopyState::Dirty,
            CopyState::CopyOnWrite => {
                self.slots = Arc::new(Slots::clone(&self.slots));
                self.copy_state = CopyState::Dirty;
            }
        }
        Arc::make_mut(&mut self.slots)
    }

    pub fn get(&self, key: &str) -> Option<&JsValue> {
        let index = self.slots.probe(key).ok()?;
        self.slots.values.get(index)?.as_ref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Flags of a live property
    pub fn flags(&self, key: &str) -> Option<PropertyFlags> {
        let index = self.slots.probe(key).ok()?;
        if !self.slots.is_live(index) {
            return None;
        }
        self.slots.flags.get(index).copied()
    }

    /// Plain assignment: read-only slots are left untouched.
    ///
    /// Callers check inherited read-only properties before inserting.
    pub fn set(&mut self, key: &JsString, value: JsValue) -> SetOutcome {
        if let Ok(index) = self.slots.probe(key.as_str()) {
            if self.slots.is_live(index) && self.slots.flags[index].is_read_only() {
                return SetOutcome::ReadOnly;
            }
        }
        let slots = self.slots_mut();
        let index = slots.claim(key);
        if !slots.is_live(index) {
            let watched = slots.flags[index].contains(PropertyFlags::WATCHED);
            slots.flags[index] = if watched {
                PropertyFlags::WATCHED
            } else {
                PropertyFlags::EMPTY
            };
        }
        slots.store(index, value)
    }

    /// Define or overwrite with explicit attributes, ignoring read-only.
    pub fn define(&mut self, key: &JsString, value: JsValue, flags: PropertyFlags) {
        let slots = self.slots_mut();
        let index = slots.claim(key);
        let watched = slots.flags[index] & PropertyFlags::WATCHED;
        slots.flags[index] = flags.without(PropertyFlags::WATCHED) | watched;
        slots.store(index, value);
    }

    /// Replace the attributes of a live property.
    pub fn set_flags(&mut self, key: &str, flags: PropertyFlags) -> bool {
        let Ok(index) = self.slots.probe(key) else {
            return false;
        };
        if !self.slots.is_live(index) {
            return false;
        }
        let slots = self.slots_mut();
        let watched = slots.flags[index] & PropertyFlags::WATCHED;
        slots.flags[index] = flags.without(PropertyFlags::WATCHED) | watched;
        true
    }

    /// `false` only for a live DontDelete property; missing keys count as deleted.
    pub fn delete(&mut self, key: &str) -> bool {
        let Ok(index) = self.slots.probe(key) else {
            return true;
        };
        if !self.slots.is_live(index) {
            return true;
        }
        if !self.slots.flags[index].is_deletable() {
            return false;
        }
        let slots = self.slots_mut();
        slots.values[index] = None;
        slots.flags[index] = slots.flags[index] & PropertyFlags::WATCHED;
        slots.size -= 1;
        true
    }

    /// Attach a watch handler; the key need not exist yet.
    pub fn watch(&mut self, key: &JsString, handler: JsValue) {
        let slots = self.slots_mut();
        let index = slots.claim(key);
        if slots.watchers.is_empty() {
            let capacity = slots.capacity();
            slots.watchers = vec![None; capacity];
        }
        slots.flags[index].insert(PropertyFlags::WATCHED);
        slots.watchers[index] = Some(handler);
    }

    pub fn unwatch(&mut self, key: &str) {
        let Ok(index) = self.slots.probe(key) else {
            return;
        };
        if !self.slots.is_watched(index) {
            return;
        }
        let slots = self.slots_mut();
        slots.flags[index].remove(PropertyFlags::WATCHED);
        if let Some(watcher) = slots.watchers.get_mut(index) {
            *watcher = None;
        }
    }

    pub fn watcher(&self, key: &str) -> Option<JsValue> {
        let index = self.slots.probe(key).ok()?;
        if !self.slots.is_watched(index) {
            return None;
        }
        self.slots.watcher(index).cloned()
    }

    /// Live properties in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&JsString, &JsValue, PropertyFlags)> + '_ {
        let slots = &*self.slots;
        slots
            .names
            .iter()
            .zip(slots.values.iter())
            .zip(slots.flags.iter())
            .filter_map(|((name, value), flags)| match (name, value) {
                (Some(name), Some(value)) => Some((name, value, *flags)),
                _ => None,
            })
    }

    /// Names of live, enumerable properties in slot order
    pub fn enumerable_keys(&self) -> Vec<JsString> {
        self.iter()
            .filter(|(_, _, flags)| flags.is_enumerable())
            .map(|(name, _, _)| name.cheap_clone())
            .collect()
    }

    /// Drop every property; used when a realm is torn down.
    pub fn clear(&mut self) {
        *self = PropertyTable::new();
    }
}

impl std::ops::BitAnd for PropertyFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyTable")
            .field("size", &self.slots.size)
            .field("fill", &self.slots.fill)
            .field("capacity", &self.capacity())
            .field("copy_state", &self.copy_state)
            .finish()
    }
}
