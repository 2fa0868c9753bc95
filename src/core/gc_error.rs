/*!

Recoverable misuse of the collector API. Allocation failure is not represented here; it is fatal.

*/

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::abstractions::IString;

#[derive(Clone, Eq, PartialEq)]
pub enum GcError {
  /// `initialize` was called while a collector is already active on this thread.
  AlreadyInitialized,
  /// `set_debug_tag` was called before the previous tag was consumed by an allocation.
  DebugTagPending {
    pending  : IString,
    requested: IString,
  },
}

impl Display for GcError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      GcError::AlreadyInitialized => {
        write!(f, "a collector is already active on this thread; nested initialization is not supported")
      }

      GcError::DebugTagPending { pending, requested } => {
        write!(
          f,
          "cannot set debug tag \"{}\": tag \"{}\" has not been consumed by an allocation yet",
          requested,
          pending
        )
      }

    } // end match on `GcError`
  }
}

impl Debug for GcError {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    Display::fmt(self, f)
  }
}

impl Error for GcError {}
