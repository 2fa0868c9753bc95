/*!

Access to the native call stack: finding the current stack position, walking the words between that position and
the bound recorded by `initialize`, and zeroing dead stack below the current frame.

Everything here reinterprets raw stack memory as machine words. The collector has no type information, so every
word is treated as a possible pointer.

*/

use std::{
  hint::black_box,
  mem::size_of,
  ptr::{read_volatile, write_volatile}
};

/// Size of a machine word in bytes.
pub const WORD: usize = size_of::<usize>();

/// Words zeroed by one frame of `scrub_dead_stack`.
const SCRUB_CHUNK_WORDS: usize = 256;

/// A word aligned address inside the calling frame.
///
/// This must be inlined so that the local lives in the caller's frame rather than in a frame that is
/// already dead by the time the address is used.
#[inline(always)]
pub(crate) fn approximate_stack_pointer() -> usize {
  let marker: usize = 0;
  let address = black_box(&marker) as *const usize as usize;
  address & !(WORD - 1)
}

/// The inclusive range of stack words between two positions, whichever way the stack grows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct StackRange {
  pub low : usize,
  pub high: usize,
}

impl StackRange {
  pub fn between(current: usize, bound: usize) -> StackRange {
    if current <= bound {
      StackRange { low: current, high: bound }
    } else {
      StackRange { low: bound, high: current }
    }
  }

  /// Number of words in the range, both ends included.
  pub fn word_count(&self) -> usize {
    (self.high - self.low) / WORD + 1
  }

  /// Calls `visitor` with the value of every word in the range, lowest address first.
  ///
  /// # Safety
  ///
  /// The whole range must lie inside the current thread's stack and must not extend past a frame that is still
  /// live. Stack slots that were never written are read as whatever bits they hold.
  pub unsafe fn for_each_word<F: FnMut(usize)>(&self, mut visitor: F) {
    let mut address = self.low;
    while address <= self.high {
      visitor(read_volatile(address as *const usize));
      address += WORD;
    }
  }
}

/// Zeroes at least `words` machine words of the dead stack region below the caller's frame.
///
/// Frames that have returned leave their values behind. A copy of a pointer the program has since discarded would
/// otherwise look like a live root to the next scan if a new frame is laid over it without writing every slot.
#[inline(never)]
pub(crate) fn scrub_dead_stack(words: usize) {
  let mut chunk = [0usize; SCRUB_CHUNK_WORDS];
  for slot in chunk.iter_mut() {
    unsafe { write_volatile(slot, 0) };
  }
  black_box(&mut chunk);

  if words > SCRUB_CHUNK_WORDS {
    scrub_dead_stack(words - SCRUB_CHUNK_WORDS);
  }
}
