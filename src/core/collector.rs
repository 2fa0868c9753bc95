/*!

# Collector

A `Collector` is the state of one conservative mark-and-sweep collector: the recorded stack bound, the allocation
table, the debug tag table, and the pending debug tag. A collector only exists for the duration of `initialize`,
which records the stack bound, hands the collector to the entry closure, runs a final collection when the closure
returns, and then releases whatever is still managed.

Every `allocate` runs a full collection before obtaining memory. A collection has three steps:

 1. **Root discovery.** Every word between the current stack position and the recorded bound is a candidate root,
    resolved with an inclusive range match against the allocation table.
 2. **Trace.** Every word inside a reached block is matched exactly against base addresses, transitively.
 3. **Sweep.** Every block not reached is released.

Memory reachable only from frames *above* the call to `initialize`, from globals, or from CPU registers that were not
spilled to the stack is invisible to the scan and will be collected.

At most one collector is active per thread. Collectors on different threads are independent: each scans only its
own thread's stack and tracks only its own blocks. A `Collector` cannot be sent to another thread.

*/

use std::{
  cell::Cell,
  marker::PhantomData,
};

use crate::{
  abstractions::IString,
  core::{
    address_table::AddressTable,
    block::{obtain_block, release_block},
    config::{CollectorConfig, DEFAULT_CONFIG},
    gc_error::GcError,
    marker::Marker,
    stack::{approximate_stack_pointer, scrub_dead_stack, StackRange},
    statistics::{DebugTags, Statistics},
    sweeper::{sweep, SweepReport},
  },
  log::{debug, info, set_global_logging_threshold},
};

thread_local! {
  static COLLECTOR_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks this thread as running a collector until dropped, including when the entry closure panics.
struct ActiveGuard;

impl ActiveGuard {
  fn acquire() -> Result<ActiveGuard, GcError> {
    COLLECTOR_ACTIVE.with(|active| {
      if active.replace(true) {
        Err(GcError::AlreadyInitialized)
      } else {
        Ok(ActiveGuard)
      }
    })
  }
}

impl Drop for ActiveGuard {
  fn drop(&mut self) {
    COLLECTOR_ACTIVE.with(|active| active.set(false));
  }
}

/// Runs `entry` with a collector that reclaims every block unreachable from `entry`'s stack, using the default
/// configuration. Returns the closure's result.
///
/// The result is returned after the final collection and after every remaining block has been released, so it must
/// not refer to managed memory.
#[inline(never)]
pub fn initialize<F, R>(entry: F) -> Result<R, GcError>
  where F: FnOnce(&mut Collector) -> R
{
  let stack_bound = approximate_stack_pointer();
  start(stack_bound, DEFAULT_CONFIG.clone(), entry)
}

/// Like `initialize`, with an explicit configuration.
#[inline(never)]
pub fn initialize_with_config<F, R>(config: CollectorConfig, entry: F) -> Result<R, GcError>
  where F: FnOnce(&mut Collector) -> R
{
  let stack_bound = approximate_stack_pointer();
  start(stack_bound, config, entry)
}

fn start<F, R>(stack_bound: usize, config: CollectorConfig, entry: F) -> Result<R, GcError>
  where F: FnOnce(&mut Collector) -> R
{
  let _guard = ActiveGuard::acquire()?;

  if let Some(threshold) = config.log_threshold {
    set_global_logging_threshold(threshold);
  }
  info!(2; stack_bound_address = stack_bound; "collector started");

  let mut collector = Collector::new(stack_bound, config);
  let result        = run_entry(entry, &mut collector);
  collector.collect();

  info!(2, "collector stopped after {} collections", collector.collection_count);
  Ok(result)
}

/// Keeps the entry closure's frame strictly below the recorded stack bound, even when optimizations would otherwise
/// inline it into the frame that holds the bound.
#[inline(never)]
fn run_entry<F, R>(entry: F, collector: &mut Collector) -> R
  where F: FnOnce(&mut Collector) -> R
{
  entry(collector)
}


pub struct Collector {
  stack_bound     : usize,
  allocations     : AddressTable,
  debug_tags      : DebugTags,
  pending_tag     : Option<IString>,
  config          : CollectorConfig,
  collection_count: usize,

  // Stack scanning is only meaningful on the thread that called `initialize`.
  _not_send       : PhantomData<*const ()>,
}

impl Collector {
  fn new(stack_bound: usize, config: CollectorConfig) -> Collector {
    Collector {
      stack_bound,
      allocations     : AddressTable::with_capacity(config.initial_table_capacity),
      debug_tags      : DebugTags::with_capacity(config.initial_table_capacity),
      pending_tag     : None,
      config,
      collection_count: 0,
      _not_send       : PhantomData,
    }
  }

  /// Runs a full collection, then returns a zero filled block of at least `size` bytes.
  ///
  /// A zero byte request is served with a one byte block so that it has a distinct, non-zero table entry; it is
  /// reported as one byte. The block is consumed by the pending debug tag, if any.
  #[inline(never)]
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    self.collect();

    let size  = size.max(1);
    let block = obtain_block(size);
    let base  = block as usize;

    self.allocations.insert(base, size);
    if let Some(label) = self.pending_tag.take() {
      self.debug_tags.attach(base, label);
    }

    block
  }

  /// Frees every block that is unreachable from the stack.
  #[inline(never)]
  pub fn collect(&mut self) {
    // Lays zeros under the frames `collect_garbage` is about to occupy.
    scrub_dead_stack(self.config.scrub_depth_words);
    self.collect_garbage();
  }

  #[inline(never)]
  fn collect_garbage(&mut self) {
    let before = Statistics::gather(&self.allocations);

    // Boxed so that the marker's own copies of block addresses are not on the stack being scanned.
    let mut marker = Marker::new_boxed(&self.allocations);

    let range = StackRange::between(approximate_stack_pointer(), self.stack_bound);
    unsafe { marker.mark_stack(range) };
    let roots_found = marker.roots_found();

    marker.trace();
    let marked  = marker.marked_count();
    let visited = marker.into_visited();

    let report = sweep(&mut self.allocations, &mut self.debug_tags, &visited, self.config.diagnostics);
    self.collection_count += 1;

    #[cfg(feature = "gc_debug")]
    if self.config.diagnostics.contains(crate::core::config::Diagnostic::CheckInvariants) {
      self.check_invariants(&before, &report);
    }

    debug!(
      3,
      "collection {}: scanned {} stack words, {} roots, {} marked, freed {} blocks ({} bytes)",
      self.collection_count,
      range.word_count(),
      roots_found,
      marked,
      report.freed_blocks,
      report.freed_bytes
    );

    if self.config.show_gc_statistics {
      self.report_statistics(&before, &report);
    }
  }

  /// Records `label` as the tag of the next allocation.
  pub fn set_debug_tag(&mut self, label: &str) -> Result<(), GcError> {
    if let Some(pending) = &self.pending_tag {
      return Err(GcError::DebugTagPending {
        pending  : pending.clone(),
        requested: IString::from(label),
      });
    }

    self.pending_tag = Some(IString::from(label));
    Ok(())
  }

  /// The tag waiting for the next allocation.
  pub fn pending_debug_tag(&self) -> Option<&IString> {
    self.pending_tag.as_ref()
  }

  /// The debug tag attached to the live block at `base`.
  pub fn debug_tag(&self, base: *const u8) -> Option<IString> {
    self.debug_tags.get(base as usize)
  }

  pub fn statistics(&self) -> Statistics {
    Statistics::gather(&self.allocations)
  }

  /// Whether `base` is the base address of a live managed block.
  pub fn contains(&self, base: *const u8) -> bool {
    let base = base as usize;
    base != 0 && self.allocations.contains(base)
  }

  /// Number of completed collection passes.
  pub fn collection_count(&self) -> usize {
    self.collection_count
  }

  pub fn config(&self) -> &CollectorConfig {
    &self.config
  }

  fn report_statistics(&self, before: &Statistics, report: &SweepReport) {
    let now = self.statistics();
    info!(
      1,
      "{:<12} {:<10} {:<12} {:<10} {:<12} {:<10} {:<12}",
      "Collection",
      "Blocks",
      "Bytes",
      "Collected",
      "Col. bytes",
      "Now",
      "Now bytes"
    );
    info!(
      1,
      "{:<12} {:<10} {:<12} {:<10} {:<12} {:<10} {:<12}",
      self.collection_count,
      before.allocation_count,
      before.total_bytes,
      report.freed_blocks,
      report.freed_bytes,
      now.allocation_count,
      now.total_bytes
    );
  }

  /// Verifies that the sweep accounted for every block and that no tag outlived its block.
  #[cfg(feature = "gc_debug")]
  fn check_invariants(&self, before: &Statistics, report: &SweepReport) {
    let now = self.statistics();
    assert_eq!(
      before.allocation_count,
      now.allocation_count + report.freed_blocks,
      "sweep lost track of a block"
    );
    assert_eq!(before.total_bytes, now.total_bytes + report.freed_bytes, "sweep lost track of bytes");

    for base in self.debug_tags.tagged() {
      assert!(self.allocations.contains(base), "debug tag outlived block {:#x}", base);
    }
  }

  /// Prints every managed block and its tag.
  #[cfg(feature = "gc_debug")]
  pub fn dump_allocations(&self) {
    eprintln!("╭──────────────────────────────────────────────────────╮");
    eprintln!("│{:<20} {:>12} {:>20}│", "Base", "Size", "Tag");
    eprintln!("├──────────────────────────────────────────────────────┤");
    for (base, size) in self.allocations.iter() {
      let tag = self.debug_tags.get(base).map(|label| label.to_string()).unwrap_or_default();
      eprintln!("│{:<#20x} {:>12} {:>20}│", base, size, tag);
    }
    eprintln!("╰──────────────────────────────────────────────────────╯");
  }
}

impl Drop for Collector {
  /// Releases every block still managed. Client references to them are dangling from here on.
  fn drop(&mut self) {
    let debug_tags = &mut self.debug_tags;
    self.allocations.for_each(|base, size| {
      debug_tags.take(base);
      unsafe { release_block(base, size) };
      0
    });
  }
}
