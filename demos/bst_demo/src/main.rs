/*!
Builds binary search trees and a character array in managed memory, drops parts of them, and shows what the collector
reclaims. Run with `MARKSWEEP_LOG_THRESHOLD=4` to see every freed block.
*/

use std::{
  ffi::{c_char, CStr},
  ptr::{null_mut, read_volatile, write_volatile},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use marksweep::{
  api::{allocate_array, allocate_object},
  initialize,
  log::{error, info, warning},
  Collector,
  CollectorConfig,
};

#[repr(C)]
struct Node {
  value: i64,
  left : *mut Node,
  right: *mut Node,
}

fn new_node(gc: &mut Collector, value: i64) -> *mut Node {
  if let Err(error) = gc.set_debug_tag("node") {
    warning!(1, "{}", error);
  }
  let node = allocate_object::<Node>(gc);
  unsafe { (*node).value = value };
  node
}

fn insert(gc: &mut Collector, node: *mut Node, value: i64) {
  let node = unsafe { &mut *node };
  if node.value == value {
    return;
  }

  let link = if node.value < value { &mut node.right } else { &mut node.left };
  if link.is_null() {
    *link = new_node(gc, value);
  } else {
    insert(gc, *link, value);
  }
}

fn count(node: *const Node) -> usize {
  match unsafe { node.as_ref() } {
    None       => 0,
    Some(node) => 1 + count(node.left) + count(node.right)
  }
}

fn print_in_order(node: *const Node, out: &mut Vec<i64>) {
  if let Some(node) = unsafe { node.as_ref() } {
    print_in_order(node.left, out);
    out.push(node.value);
    print_in_order(node.right, out);
  }
}

/// Writes the tree root into `slot`, which lives in the caller's frame and is therefore scanned.
#[inline(never)]
fn build_tree(gc: &mut Collector, slot: &mut usize, values: &[i64]) {
  let tree = new_node(gc, values[0]);
  unsafe { write_volatile(slot, tree as usize) };
  for &value in &values[1..] {
    insert(gc, tree, value);
  }
}

#[inline(never)]
fn detach_left(slot: &usize) -> usize {
  let tree     = unsafe { &mut *(read_volatile(slot) as *mut Node) };
  let detached = count(tree.left);
  tree.left    = null_mut();
  detached
}

#[inline(never)]
fn in_order(slot: &usize) -> Vec<i64> {
  let mut values = Vec::new();
  print_in_order(unsafe { read_volatile(slot) } as *const Node, &mut values);
  values
}

fn fixed_tree(gc: &mut Collector) {
  let mut root = 0usize;
  build_tree(gc, &mut root, &[5, 1, 2, 7, 6, 4, 3]);
  gc.collect();
  info!(1, "fixed tree {:?}: {}", in_order(&root), gc.statistics());

  let detached = detach_left(&root);
  gc.collect();
  info!(1, "detached {} nodes, tree {:?}: {}", detached, in_order(&root), gc.statistics());

  unsafe { write_volatile(&mut root, 0) };
  gc.collect();
  info!(1, "tree dropped: {}", gc.statistics());
}

fn random_tree(gc: &mut Collector, values: &[i64]) {
  let mut root = 0usize;
  build_tree(gc, &mut root, values);
  gc.collect();
  let before = gc.statistics();

  let detached = detach_left(&root);
  gc.collect();
  let after = gc.statistics();

  info!(
    1,
    "random tree: detached {} of {} nodes, {} blocks freed",
    detached,
    before.allocation_count,
    before.allocation_count - after.allocation_count
  );

  unsafe { write_volatile(&mut root, 0) };
  gc.collect();
}

#[inline(never)]
fn write_iroha(gc: &mut Collector, slot: &mut usize) {
  if let Err(error) = gc.set_debug_tag("character-array") {
    warning!(1, "{}", error);
  }
  let text = allocate_array::<u8>(gc, 32);
  unsafe {
    text.add(5).copy_from_nonoverlapping(b"iroha\0".as_ptr(), 6);
    write_volatile(slot, text as usize + 5);
  }
}

fn character_array(gc: &mut Collector) {
  let mut end = 0usize;
  write_iroha(gc, &mut end);
  gc.collect();

  let text = unsafe { CStr::from_ptr(read_volatile(&end) as *const c_char) };
  info!(1, "still reachable through an offset pointer: {:?}, {}", text, gc.statistics());

  unsafe { write_volatile(&mut end, 0) };
  gc.collect();
  info!(1, "after discarding it: {}", gc.statistics());
}

fn main() {
  let mut rng = StdRng::seed_from_u64(2024);
  let values: Vec<i64> = (0..200).map(|_| rng.gen_range(-1000..1000)).collect();

  let config = CollectorConfig::from_env().with_gc_statistics(false);
  let result = marksweep::initialize_with_config(config, |gc| {
    fixed_tree(gc);
    random_tree(gc, &values);
    character_array(gc);
    gc.collection_count()
  });

  match result {
    Ok(collections) => info!(1, "done after {} collections", collections),
    Err(error)      => error!(0, "{}", error),
  }

  // A second collector on the same thread is fine once the first is gone.
  let nested = initialize(|_| initialize(|_| ()));
  if let Ok(Err(error)) = nested {
    info!(1, "nested initialization rejected: {}", error);
  }
}
