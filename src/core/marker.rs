/*!

The mark phase. Candidate words from the stack are resolved against the allocation table with an inclusive range
match: a candidate anchors the block at `base` if `base <= candidate <= base + size`, so a pointer into the middle of a
block or one past its last byte keeps the block alive. Words found *inside* a reached block are matched exactly against
base addresses only; an interior pointer stored in the heap does not keep its target alive on its own.

Tracing uses an explicit worklist rather than recursion, so deep structures cannot exhaust the call stack. The
visited set is indexed by allocation table slot. The table is not modified between marking and sweeping, so slot
indices stay valid for the whole pass.

*/

use bit_set::BitSet;

use crate::core::{
  address_table::{AddressTable, SlotIndex},
  block::block_words,
  stack::{StackRange, WORD},
};

pub(crate) struct Marker<'t> {
  allocations: &'t AddressTable,
  visited    : BitSet,
  worklist   : Vec<SlotIndex>,

  // Inclusive bounds of every range a root could match, for a cheap reject.
  lowest_base: usize,
  highest_end: usize,

  roots_found: usize,
}

impl<'t> Marker<'t> {
  /// Creates a marker on the heap.
  ///
  /// The bounds computed here are themselves addresses of managed blocks. They are built in this frame and moved
  /// straight into the box, so that no copy of them sits in a frame the root scan will later read.
  #[inline(never)]
  pub fn new_boxed(allocations: &'t AddressTable) -> Box<Marker<'t>> {
    let mut marker = Box::new(Marker {
      allocations,
      visited    : BitSet::with_capacity(allocations.capacity()),
      worklist   : Vec::new(),
      lowest_base: usize::MAX,
      highest_end: 0,
      roots_found: 0,
    });

    for (base, size) in allocations.iter() {
      marker.lowest_base = marker.lowest_base.min(base);
      marker.highest_end = marker.highest_end.max(base.saturating_add(size));
    }

    marker
  }

  /// Number of distinct blocks anchored directly by root candidates.
  pub fn roots_found(&self) -> usize {
    self.roots_found
  }

  /// Number of blocks marked so far.
  pub fn marked_count(&self) -> usize {
    self.visited.len()
  }

  /// Resolves a root candidate with the inclusive range match and queues every block it anchors.
  ///
  /// When a one-past-the-end address of one block is also the base of the next, both blocks are anchored.
  pub fn mark_root_candidate(&mut self, candidate: usize) {
    if candidate < self.lowest_base || candidate > self.highest_end {
      return;
    }

    for slot in 0..self.allocations.capacity() {
      let (base, size) = self.allocations.slot(slot);
      if size != 0 && base <= candidate && candidate <= base + size && self.visit(slot) {
        self.roots_found += 1;
      }
    }
  }

  /// Scans the stack words in `range` as root candidates.
  ///
  /// # Safety
  ///
  /// Same requirements as `StackRange::for_each_word`.
  #[inline(never)]
  pub unsafe fn mark_stack(&mut self, range: StackRange) {
    range.for_each_word(|word| self.mark_root_candidate(word));
  }

  /// Follows exact base address references from every queued block until no new block is reached.
  pub fn trace(&mut self) {
    while let Some(slot) = self.worklist.pop() {
      let (base, size) = self.allocations.slot(slot);

      for index in 0..block_words(size) {
        // Blocks are padded to whole words, so the last word is in bounds.
        let word = unsafe { std::ptr::read((base + index * WORD) as *const usize) };
        if let Some(target) = self.allocations.slot_of(word) {
          self.visit(target);
        }
      }
    }
  }

  /// Marks `slot` and queues it for scanning. Returns `false` if it was already marked.
  #[inline(always)]
  fn visit(&mut self, slot: SlotIndex) -> bool {
    if self.visited.insert(slot) {
      self.worklist.push(slot);
      true
    } else {
      false
    }
  }

  pub fn into_visited(self: Box<Self>) -> BitSet {
    self.visited
  }
}
