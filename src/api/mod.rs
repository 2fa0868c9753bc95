/*!

Typed conveniences over `Collector::allocate`. These are ordinary client code: they compute a byte count and cast the
returned block.

*/

use std::mem::{align_of, size_of};

use crate::core::{block::BLOCK_ALIGN, Collector};

/// Allocates a zero filled block large enough for one `T`.
pub fn allocate_object<T>(collector: &mut Collector) -> *mut T {
  allocate_array::<T>(collector, 1)
}

/// Allocates a zero filled block large enough for `count` values of type `T`.
///
/// Panics if the byte count overflows or if `T` needs stricter alignment than managed blocks provide.
pub fn allocate_array<T>(collector: &mut Collector, count: usize) -> *mut T {
  assert!(
    align_of::<T>() <= BLOCK_ALIGN,
    "managed blocks are aligned to {} bytes, but this type needs {}",
    BLOCK_ALIGN,
    align_of::<T>()
  );

  let bytes = match size_of::<T>().checked_mul(count) {
    Some(bytes) => bytes,
    None        => panic!("array of {} elements of {} bytes overflows", count, size_of::<T>()),
  };

  collector.allocate(bytes) as *mut T
}
