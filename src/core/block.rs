/*!

Raw blocks handed out to clients. A block is obtained from the global allocator zero filled, aligned like `malloc`
memory, and padded to a whole number of machine words so that the intra-object scan never reads past its end. The
allocation table records the size the client asked for; the layout is recomputed from it when the block is freed.

*/

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};

use crate::core::stack::WORD;

/// Alignment of every managed block.
pub const BLOCK_ALIGN: usize = 16;

/// Number of words the tracer scans in a block of `size` requested bytes.
#[inline(always)]
pub(crate) fn block_words(size: usize) -> usize {
  size.div_ceil(WORD)
}

/// The layout of a block of `size` requested bytes. Panics if the padded size is not representable.
fn block_layout(size: usize) -> Layout {
  let layout = block_words(size)
      .checked_mul(WORD)
      .and_then(|padded| Layout::from_size_align(padded, BLOCK_ALIGN).ok());

  match layout {
    Some(layout) => layout,
    None         => panic!("cannot allocate a block of {} bytes", size),
  }
}

/// Obtains a zero filled block of at least `size` bytes. `size` must be non-zero.
///
/// Allocation failure is fatal.
pub(crate) fn obtain_block(size: usize) -> *mut u8 {
  assert_ne!(size, 0, "zero sized blocks cannot be registered");
  let layout = block_layout(size);
  let block  = unsafe { alloc_zeroed(layout) };
  if block.is_null() {
    handle_alloc_error(layout);
  }
  block
}

/// Returns a block to the global allocator.
///
/// # Safety
///
/// `base` must have come from `obtain_block(size)` with the same `size` and must not have been released already.
pub(crate) unsafe fn release_block(base: usize, size: usize) {
  dealloc(base as *mut u8, block_layout(size));
}
