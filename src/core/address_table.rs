/*!

An `AddressTable` is a growable associative store from a machine address to a machine word. The collector keeps two of
them: the allocation table (base address → size in bytes) and the debug tag table (base address → label handle).

The table is deliberately simple: two parallel arrays searched linearly. Both `0` as a key and `0` as a value are
reserved. A value of `0` means "slot empty", so inserting `0` for a present key deletes it, and inserting `0` for an
absent key does nothing. When no empty slot remains the arrays double in size; existing pairs keep their values.

*/

use crate::log::trace;

/// The capacity used by `AddressTable::new()`.
pub const DEFAULT_TABLE_CAPACITY: usize = 32;

/// Position of a slot in the backing arrays. Only meaningful until the table next grows.
pub(crate) type SlotIndex = usize;

#[derive(Clone, Debug)]
pub struct AddressTable {
  keys  : Vec<usize>,
  values: Vec<usize>,
}

impl Default for AddressTable {
  fn default() -> Self {
    AddressTable::new()
  }
}

impl AddressTable {
  /// An empty table with a small initial capacity.
  pub fn new() -> Self {
    AddressTable::with_capacity(DEFAULT_TABLE_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    assert!(capacity > 0, "an address table needs at least one slot");
    AddressTable {
      keys  : vec![0; capacity],
      values: vec![0; capacity],
    }
  }

  /// Number of slots in the backing arrays, occupied or not.
  #[inline(always)]
  pub fn capacity(&self) -> usize {
    self.keys.len()
  }

  /// Number of slots holding a non-zero value.
  pub fn len(&self) -> usize {
    self.values.iter().filter(|&&value| value != 0).count()
  }

  pub fn is_empty(&self) -> bool {
    self.values.iter().all(|&value| value == 0)
  }

  /// Makes subsequent `get(key)` return `value`. A `value` of `0` deletes `key`.
  pub fn insert(&mut self, key: usize, value: usize) {
    assert_ne!(key, 0, "0 is reserved and cannot be used as a key");

    // Update an existing pair. A slot emptied by deletion keeps its old key, so this also revives it.
    if let Some(slot) = self.keys.iter().position(|&k| k == key) {
      self.values[slot] = value;
      return;
    }

    if value == 0 {
      return;
    }

    loop {
      if let Some(slot) = self.values.iter().position(|&v| v == 0) {
        self.keys[slot]   = key;
        self.values[slot] = value;
        return;
      }

      self.grow();
    }
  }

  /// The value most recently inserted for `key`, or `0` if there is none.
  pub fn get(&self, key: usize) -> usize {
    match self.keys.iter().position(|&k| k == key) {
      Some(slot) => self.values[slot],
      None       => 0
    }
  }

  /// Whether `key` is mapped to a non-zero value.
  #[inline(always)]
  pub fn contains(&self, key: usize) -> bool {
    self.get(key) != 0
  }

  /// Maps every key to `0`. The capacity is retained.
  pub fn clear(&mut self) {
    self.values.fill(0);
  }

  /// Calls `visitor(key, value)` for every occupied slot and stores its return value as the slot's new value.
  /// Returning `0` deletes the pair. Iteration order is unspecified.
  pub fn for_each<F>(&mut self, mut visitor: F)
    where F: FnMut(usize, usize) -> usize
  {
    self.for_each_slot(|_, key, value| visitor(key, value));
  }

  /// Like `for_each`, but the visitor also receives the slot index of the pair.
  pub(crate) fn for_each_slot<F>(&mut self, mut visitor: F)
    where F: FnMut(SlotIndex, usize, usize) -> usize
  {
    for slot in 0..self.keys.len() {
      let value = self.values[slot];
      if value != 0 {
        self.values[slot] = visitor(slot, self.keys[slot], value);
      }
    }
  }

  /// Read-only iteration over occupied `(key, value)` pairs.
  pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
    self.keys
        .iter()
        .zip(self.values.iter())
        .filter(|&(_, &value)| value != 0)
        .map(|(&key, &value)| (key, value))
  }

  /// The slot holding a live pair with exactly this `key`.
  pub(crate) fn slot_of(&self, key: usize) -> Option<SlotIndex> {
    if key == 0 {
      return None;
    }
    self.keys
        .iter()
        .zip(self.values.iter())
        .position(|(&k, &v)| k == key && v != 0)
  }

  /// The `(key, value)` pair stored in `slot`.
  #[inline(always)]
  pub(crate) fn slot(&self, slot: SlotIndex) -> (usize, usize) {
    (self.keys[slot], self.values[slot])
  }

  /// Doubles the capacity, preserving every pair. New slots are empty.
  fn grow(&mut self) {
    let new_capacity = self.keys.len() * 2;
    trace!(5, "address table grows from {} to {} slots", self.keys.len(), new_capacity);

    self.keys.resize(new_capacity, 0);
    self.values.resize(new_capacity, 0);
  }
}
