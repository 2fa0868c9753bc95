/*!

The sweep phase: every block in the allocation table whose slot was not marked is released, its debug tag (if any) is
reported and removed, and its table entry is deleted. Marked entries keep their size unchanged.

*/

use bit_set::BitSet;
use enumflags2::BitFlags;

use crate::{
  core::{
    address_table::AddressTable,
    block::release_block,
    config::Diagnostic,
    statistics::DebugTags,
  },
  log::trace,
};

/// What one sweep released.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct SweepReport {
  pub freed_blocks: usize,
  pub freed_bytes : usize,
}

pub(crate) fn sweep(
  allocations: &mut AddressTable,
  debug_tags : &mut DebugTags,
  visited    : &BitSet,
  diagnostics: BitFlags<Diagnostic>,
) -> SweepReport
{
  let mut report = SweepReport::default();

  allocations.for_each_slot(|slot, base, size| {
    if visited.contains(slot) {
      return size;
    }

    let tag = debug_tags.take(base);
    if diagnostics.contains(Diagnostic::ReportFrees) {
      match tag {
        Some(label) if diagnostics.contains(Diagnostic::ReportTags) => {
          trace!(4; address = base; "freed {} bytes [{}]", size, label);
        }
        _ => {
          trace!(4; address = base; "freed {} bytes", size);
        }
      }
    }

    unsafe { release_block(base, size) };
    report.freed_blocks += 1;
    report.freed_bytes  += size;

    0
  });

  report
}
