/*!
Collector scenarios.

The scan is conservative, so a test only gets deterministic answers if it controls which stack words hold block
addresses. The rules followed here:

 - Roots live in `Root` slots declared in the entry closure, written and read with volatile accesses.
 - Every other piece of code that touches a block address runs in an `#[inline(never)]` helper, whose frame is dead
   by the time the closure collects.
 - The closure collects with `collect_cleanly!`, which zeroes the dead frames below it first.
*/

use std::{
  ffi::{c_char, CStr},
  mem::size_of,
  ptr::{null_mut, read_volatile, write_volatile},
};

use enumflags2::BitFlags;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
  api::{allocate_array, allocate_object},
  core::stack::scrub_dead_stack,
  initialize,
  initialize_with_config,
  Collector,
  CollectorConfig,
  GcError,
  IString,
  Statistics,
  WORD,
};

const TEST_SCRUB_WORDS: usize = 8 * 1024;

macro_rules! collect_cleanly {
  ($gc:expr) => {{
    scrub_dead_stack(TEST_SCRUB_WORDS);
    $gc.collect();
  }};
}

/// A stack slot the root scan is guaranteed to read.
struct Root {
  word: usize,
}

impl Root {
  fn new() -> Root {
    Root { word: 0 }
  }

  #[inline(never)]
  fn set(&mut self, value: usize) {
    unsafe { write_volatile(&mut self.word, value) };
  }

  #[inline(never)]
  fn get(&self) -> usize {
    unsafe { read_volatile(&self.word) }
  }

  fn clear(&mut self) {
    self.set(0);
  }
}

fn stats(allocation_count: usize, total_bytes: usize) -> Statistics {
  Statistics { allocation_count, total_bytes }
}

#[inline(never)]
fn allocate_into(gc: &mut Collector, size: usize, root: &mut Root) {
  let block = gc.allocate(size);
  root.set(block as usize);
}

#[inline(never)]
fn allocate_with_offset_root(gc: &mut Collector, size: usize, offset: usize, root: &mut Root) {
  let block = gc.allocate(size);
  root.set(block as usize + offset);
}

#[inline(never)]
fn allocate_and_drop(gc: &mut Collector, size: usize) {
  let block = gc.allocate(size);
  unsafe { block.write_bytes(0xAB, size) };
}

#[inline(never)]
fn shift_root(root: &mut Root, delta: usize) {
  let value = root.get();
  root.set(value + delta);
}

#[inline(never)]
fn root_is_live(gc: &Collector, root: &Root) -> bool {
  gc.contains(root.get() as *const u8)
}


#[test]
fn allocation_is_writable() {
  #[inline(never)]
  fn write_and_read_back(gc: &mut Collector, size: usize) -> bool {
    let block = gc.allocate(size);
    let bytes = unsafe { std::slice::from_raw_parts_mut(block, size) };
    for (index, byte) in bytes.iter_mut().enumerate() {
      *byte = (index * 7 + 3) as u8;
    }
    bytes.iter().enumerate().all(|(index, &byte)| byte == (index * 7 + 3) as u8)
  }

  initialize(|gc| {
    for size in [1, 7, 8, 33, 4096] {
      assert!(write_and_read_back(gc, size), "size {}", size);
    }
  }).unwrap();
}

#[test]
fn rooted_block_survives() {
  initialize(|gc| {
    let mut root = Root::new();
    allocate_into(gc, 48, &mut root);
    assert_eq!(gc.statistics(), stats(1, 48));

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 48));
    assert!(root_is_live(gc, &root));

    // An interior address is just as good a root.
    shift_root(&mut root, 20);
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 48));
  }).unwrap();
}

#[test]
fn unrooted_block_is_freed() {
  initialize(|gc| {
    let mut kept = Root::new();
    allocate_into(gc, 32, &mut kept);
    allocate_and_drop(gc, 24);
    assert_eq!(gc.statistics(), stats(2, 56));

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 32));
    assert!(root_is_live(gc, &kept));
  }).unwrap();
}

#[test]
fn everything_is_freed_once_roots_are_cleared() {
  initialize(|gc| {
    let mut first  = Root::new();
    let mut second = Root::new();
    allocate_into(gc, 16, &mut first);
    allocate_into(gc, 64, &mut second);

    first.clear();
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 64));

    second.clear();
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(0, 0));
  }).unwrap();
}

#[test]
fn cycles_are_retained_then_freed_together() {
  #[inline(never)]
  fn build_cycle(gc: &mut Collector, root: &mut Root, scratch: &mut Root) {
    allocate_into(gc, 2 * WORD, root);
    allocate_into(gc, 2 * WORD, scratch);

    let a = root.get() as *mut usize;
    let b = scratch.get() as *mut usize;
    unsafe {
      *a = b as usize;
      *b = a as usize;
    }
    scratch.clear();
  }

  initialize(|gc| {
    let mut root    = Root::new();
    let mut scratch = Root::new();
    build_cycle(gc, &mut root, &mut scratch);

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(2, 4 * WORD));

    root.clear();
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(0, 0));
  }).unwrap();
}

#[test]
fn one_past_the_end_anchors_but_two_past_does_not() {
  initialize(|gc| {
    let mut root = Root::new();
    allocate_with_offset_root(gc, 24, 24, &mut root);

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 24));

    shift_root(&mut root, 1);
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(0, 0));
  }).unwrap();
}

#[test]
fn interior_pointers_in_the_heap_do_not_retain() {
  #[inline(never)]
  fn link_by_interior_pointer(gc: &mut Collector, holder: &mut Root, scratch: &mut Root) {
    allocate_into(gc, 2 * WORD, holder);
    allocate_into(gc, 4 * WORD, scratch);

    let target = scratch.get() + WORD;
    unsafe { *(holder.get() as *mut usize) = target };
    scratch.clear();
  }

  initialize(|gc| {
    let mut holder  = Root::new();
    let mut scratch = Root::new();
    link_by_interior_pointer(gc, &mut holder, &mut scratch);
    assert_eq!(gc.statistics(), stats(2, 6 * WORD));

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 2 * WORD));
    assert!(root_is_live(gc, &holder));
  }).unwrap();
}

// region Character array

#[inline(never)]
fn fill_iroha(gc: &mut Collector, end: &mut Root) {
  gc.set_debug_tag("character-array").unwrap();
  let text = allocate_array::<u8>(gc, 32);
  unsafe { std::ptr::copy_nonoverlapping(b"iroha\0".as_ptr(), text.add(5), 6) };
  end.set(text as usize + 5);
}

#[inline(never)]
fn read_c_string(root: &Root) -> String {
  unsafe { CStr::from_ptr(root.get() as *const c_char) }.to_string_lossy().into_owned()
}

#[test]
fn array_retained_by_offset_pointer() {
  initialize(|gc| {
    let mut end = Root::new();
    fill_iroha(gc, &mut end);
    assert_eq!(gc.statistics(), stats(1, 32));

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 32));
    assert_eq!(read_c_string(&end), "iroha");
  }).unwrap();
}

#[test]
fn array_fully_discarded() {
  initialize(|gc| {
    let mut end = Root::new();
    fill_iroha(gc, &mut end);
    end.clear();

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(0, 0));
  }).unwrap();
}

// endregion

// region Binary search tree

#[repr(C)]
struct Node {
  value: i64,
  left : *mut Node,
  right: *mut Node,
}

fn node_new(gc: &mut Collector, value: i64) -> *mut Node {
  gc.set_debug_tag("node").unwrap();
  let node = allocate_object::<Node>(gc);
  unsafe {
    (*node).value = value;
    (*node).left  = null_mut();
    (*node).right = null_mut();
  }
  node
}

fn node_insert(gc: &mut Collector, node: *mut Node, value: i64) {
  let node = unsafe { &mut *node };
  if node.value == value {
    return;
  }

  let link = if node.value < value { &mut node.right } else { &mut node.left };
  if link.is_null() {
    *link = node_new(gc, value);
  } else {
    node_insert(gc, *link, value);
  }
}

fn count_nodes(node: *const Node) -> usize {
  match unsafe { node.as_ref() } {
    None       => 0,
    Some(node) => 1 + count_nodes(node.left) + count_nodes(node.right)
  }
}

#[inline(never)]
fn build_tree(gc: &mut Collector, root: &mut Root, values: &[i64]) {
  let tree = node_new(gc, values[0]);
  root.set(tree as usize);
  for &value in &values[1..] {
    node_insert(gc, tree, value);
  }
}

#[inline(never)]
fn tree_size(root: &Root) -> usize {
  count_nodes(root.get() as *const Node)
}

/// Unlinks the larger child subtree of the root and returns its node count.
#[inline(never)]
fn detach_larger_subtree(root: &Root) -> usize {
  let tree  = unsafe { &mut *(root.get() as *mut Node) };
  let left  = count_nodes(tree.left);
  let right = count_nodes(tree.right);

  if left >= right {
    tree.left = null_mut();
    left
  } else {
    tree.right = null_mut();
    right
  }
}

#[test]
fn detached_subtree_is_freed() {
  initialize(|gc| {
    let mut root = Root::new();
    build_tree(gc, &mut root, &[5, 1, 2, 7, 6, 4, 3]);

    let node_size = size_of::<Node>();
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(7, 7 * node_size));

    // 1, 2, 4, 3 hang off the left of 5.
    let detached = detach_larger_subtree(&root);
    assert_eq!(detached, 4);

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(3, 3 * node_size));
    assert_eq!(tree_size(&root), 3);
  }).unwrap();
}

#[test]
fn random_subtree_detachment() {
  #[inline(never)]
  fn random_values(seed: u64, count: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(-500..500)).collect()
  }

  for seed in 0..4u64 {
    let values = random_values(seed, 60);

    initialize(|gc| {
      let mut root = Root::new();
      build_tree(gc, &mut root, &values);

      collect_cleanly!(gc);
      let before = gc.statistics();
      assert_eq!(before.allocation_count, tree_size(&root));

      let detached = detach_larger_subtree(&root);
      collect_cleanly!(gc);
      let after = gc.statistics();

      assert_eq!(before.allocation_count - after.allocation_count, detached);
      assert_eq!(before.total_bytes - after.total_bytes, detached * size_of::<Node>());
    }).unwrap();
  }
}

// endregion

#[test]
fn table_grows_past_initial_capacity() {
  const BLOCKS: usize = 100;

  #[inline(never)]
  fn fill(gc: &mut Collector, array: &mut Root) {
    allocate_into(gc, BLOCKS * WORD, array);
    for index in 0..BLOCKS {
      let block = gc.allocate(WORD);
      unsafe { *(array.get() as *mut usize).add(index) = block as usize };
    }
  }

  #[inline(never)]
  fn drop_odd_entries(array: &Root) {
    for index in (1..BLOCKS).step_by(2) {
      unsafe { *(array.get() as *mut usize).add(index) = 0 };
    }
  }

  let config = CollectorConfig::default().with_initial_table_capacity(4);
  initialize_with_config(config, |gc| {
    let mut array = Root::new();
    fill(gc, &mut array);

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(BLOCKS + 1, 2 * BLOCKS * WORD));

    drop_odd_entries(&array);
    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(BLOCKS / 2 + 1, BLOCKS * WORD + BLOCKS / 2 * WORD));
  }).unwrap();
}

#[test]
fn garbage_does_not_accumulate() {
  initialize(|gc| {
    let mut peak = 0;
    for _ in 0..200 {
      allocate_and_drop(gc, 40);
      peak = peak.max(gc.statistics().allocation_count);
    }
    assert!(peak < 10, "peak of {} live blocks", peak);

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(0, 0));
  }).unwrap();
}

#[test]
fn zero_byte_requests_get_one_byte_blocks() {
  initialize(|gc| {
    let mut root = Root::new();
    allocate_into(gc, 0, &mut root);
    assert_ne!(root.get(), 0);
    assert_eq!(gc.statistics(), stats(1, 1));

    collect_cleanly!(gc);
    assert_eq!(gc.statistics(), stats(1, 1));
    assert!(root_is_live(gc, &root));
  }).unwrap();
}

#[test]
#[should_panic(expected = "cannot allocate a block")]
fn unrepresentable_request_is_fatal() {
  let _ = initialize(|gc| {
    let _ = gc.allocate(usize::MAX);
  });
}

// region Debug tags

#[test]
fn debug_tag_is_consumed_by_next_allocation() {
  #[inline(never)]
  fn tag_of(gc: &Collector, root: &Root) -> Option<IString> {
    gc.debug_tag(root.get() as *const u8)
  }

  initialize(|gc| {
    gc.set_debug_tag("first").unwrap();
    assert_eq!(gc.pending_debug_tag(), Some(&IString::from("first")));

    let mut tagged   = Root::new();
    let mut untagged = Root::new();
    allocate_into(gc, 8, &mut tagged);
    assert_eq!(gc.pending_debug_tag(), None);
    allocate_into(gc, 8, &mut untagged);

    assert_eq!(tag_of(gc, &tagged), Some(IString::from("first")));
    assert_eq!(tag_of(gc, &untagged), None);
  }).unwrap();
}

#[test]
fn second_pending_tag_is_rejected() {
  initialize(|gc| {
    gc.set_debug_tag("first").unwrap();
    let error = gc.set_debug_tag("second").unwrap_err();

    assert_eq!(
      error,
      GcError::DebugTagPending { pending: IString::from("first"), requested: IString::from("second") }
    );
    assert!(error.to_string().contains("\"first\""));
    assert_eq!(gc.pending_debug_tag(), Some(&IString::from("first")));
  }).unwrap();
}

#[test]
fn freed_blocks_drop_their_tags() {
  let config = CollectorConfig::default().with_diagnostics(BitFlags::all());
  initialize_with_config(config, |gc| {
    let mut end = Root::new();
    fill_iroha(gc, &mut end);
    end.clear();
    collect_cleanly!(gc);

    // The sweep's own consistency check would have caught a stale tag.
    assert_eq!(gc.statistics(), stats(0, 0));
    #[cfg(feature = "gc_debug")]
    gc.dump_allocations();
  }).unwrap();
}

// endregion

// region Lifecycle

#[test]
fn initialize_returns_entry_result() {
  assert_eq!(initialize(|_| 42).unwrap(), 42);
}

#[test]
fn nested_initialize_is_rejected() {
  let inner = initialize(|_| initialize(|_| ())).unwrap();
  assert_eq!(inner, Err(GcError::AlreadyInitialized));

  // The thread is free again once the outer collector is gone.
  assert!(initialize(|_| ()).is_ok());
}

#[test]
fn panicking_entry_releases_the_thread() {
  let outcome = std::panic::catch_unwind(|| {
    let _ = initialize(|gc| {
      let _ = gc.allocate(16);
      panic!("entry failed");
    });
  });
  assert!(outcome.is_err());
  assert!(initialize(|_| ()).is_ok());
}

#[test]
fn collectors_on_different_threads_are_independent() {
  let handles: Vec<_> = [16usize, 48]
      .into_iter()
      .map(|size| {
        std::thread::spawn(move || {
          initialize(|gc| {
            let mut first  = Root::new();
            let mut second = Root::new();
            allocate_into(gc, size, &mut first);
            allocate_into(gc, size, &mut second);
            collect_cleanly!(gc);
            gc.statistics()
          }).unwrap()
        })
      })
      .collect();

  let results: Vec<Statistics> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
  assert_eq!(results, vec![stats(2, 32), stats(2, 96)]);
}

#[test]
fn collections_are_counted() {
  let config = CollectorConfig::default().with_gc_statistics(true);
  initialize_with_config(config, |gc| {
    assert_eq!(gc.collection_count(), 0);
    allocate_and_drop(gc, 8);
    assert_eq!(gc.collection_count(), 1);
    gc.collect();
    assert_eq!(gc.collection_count(), 2);
    assert!(gc.config().show_gc_statistics);
  }).unwrap();
}

// endregion
