/*!

Read-only statistics over the allocation table, and the debug tag registry.

A debug tag is a human readable label attached to the next allocation. It has no effect on reachability or sizing; it
is reported when its block is freed. The tag table maps a block's base address to a non-zero label handle, which is
one more than the label's index in the registry. A label stays registered only while some live block carries it;
the slot it occupied is reused by the next new label.

*/

use std::{
  collections::HashMap,
  fmt::{Display, Formatter},
};

use crate::{
  abstractions::IString,
  core::address_table::AddressTable,
};

/// Live allocation count and byte total of a collector.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Statistics {
  /// The number of blocks managed by the collector.
  pub allocation_count: usize,
  /// The total size in bytes of all managed blocks as requested by the client, excluding overhead.
  pub total_bytes     : usize,
}

impl Statistics {
  pub fn gather(allocations: &AddressTable) -> Statistics {
    allocations.iter().fold(
      Statistics::default(),
      |statistics, (_, size)| Statistics {
        allocation_count: statistics.allocation_count + 1,
        total_bytes     : statistics.total_bytes + size,
      }
    )
  }
}

impl Display for Statistics {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} bytes across {} allocations", self.total_bytes, self.allocation_count)
  }
}


#[derive(Debug)]
struct LabelEntry {
  label: IString,
  /// Number of live blocks carrying this label.
  users: usize,
}

#[derive(Debug, Default)]
pub(crate) struct DebugTags {
  handles : AddressTable,
  labels  : Vec<Option<LabelEntry>>,
  by_label: HashMap<IString, usize>,
  // Indices of `labels` whose entry was released, reused before the registry grows.
  vacant  : Vec<usize>,
}

impl DebugTags {
  pub fn with_capacity(capacity: usize) -> DebugTags {
    DebugTags {
      handles : AddressTable::with_capacity(capacity),
      labels  : Vec::new(),
      by_label: HashMap::new(),
      vacant  : Vec::new(),
    }
  }

  /// Attaches `label` to the block at `base`, replacing any tag it already had. Equal labels share a handle.
  pub fn attach(&mut self, base: usize, label: IString) {
    self.take(base);

    let index = match self.by_label.get(&label) {
      Some(&index) => index,
      None => self.register(label),
    };
    if let Some(entry) = self.labels[index].as_mut() {
      entry.users += 1;
    }
    self.handles.insert(base, index + 1);
  }

  pub fn get(&self, base: usize) -> Option<IString> {
    match self.handles.get(base) {
      0      => None,
      handle => self.labels[handle - 1].as_ref().map(|entry| entry.label.clone())
    }
  }

  /// Removes and returns the label of the block at `base`. A label no block carries any more leaves the registry.
  pub fn take(&mut self, base: usize) -> Option<IString> {
    let handle = self.handles.get(base);
    if handle == 0 {
      return None;
    }
    self.handles.insert(base, 0);

    let index = handle - 1;
    let entry = self.labels[index].as_mut()?;
    entry.users -= 1;
    let label = entry.label.clone();

    if entry.users == 0 {
      self.labels[index] = None;
      self.by_label.remove(&label);
      self.vacant.push(index);
    }

    Some(label)
  }

  /// Base addresses that currently carry a tag.
  pub fn tagged(&self) -> impl Iterator<Item = usize> + '_ {
    self.handles.iter().map(|(base, _)| base)
  }

  /// Number of distinct labels carried by live blocks.
  pub fn registered_labels(&self) -> usize {
    self.by_label.len()
  }

  fn register(&mut self, label: IString) -> usize {
    let entry = Some(LabelEntry { label: label.clone(), users: 0 });
    let index = match self.vacant.pop() {
      Some(index) => {
        self.labels[index] = entry;
        index
      }
      None => {
        self.labels.push(entry);
        self.labels.len() - 1
      }
    };
    self.by_label.insert(label, index);
    index
  }
}
