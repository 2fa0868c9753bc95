/*!

A conservative, stop-the-world, mark-and-sweep collector for raw heap blocks.

The host runs its program inside `initialize`. Every block obtained from `Collector::allocate` is released
automatically once no word on the program's stack points into it and no reachable block holds its exact base
address.

```
use marksweep::{api::allocate_array, initialize};

let length = initialize(|gc| {
  let text: *mut u8 = allocate_array::<u8>(gc, 6);
  unsafe { text.copy_from_nonoverlapping(b"iroha\0".as_ptr(), 6) };
  gc.statistics().total_bytes
}).unwrap();

assert_eq!(length, 6);
```

*/

pub mod api;
pub mod abstractions;
mod core;

// We re-export abstractions that are meant to be used publicly.
pub use abstractions::{
  log,
  IString
};

pub use crate::core::{
  initialize,
  initialize_with_config,
  AddressTable,
  Collector,
  CollectorConfig,
  Diagnostic,
  GcError,
  Statistics,
  BLOCK_ALIGN,
  DEFAULT_SCRUB_DEPTH_WORDS,
  DEFAULT_TABLE_CAPACITY,
  WORD,
};
