/*!

The collector engine. Leaf first:

| Module          | Role                                                        |
|:----------------|:------------------------------------------------------------|
| `address_table` | growable address → word store, `0` reserved as "absent"     |
| `block`         | obtaining and releasing raw client blocks                   |
| `stack`         | current stack position, stack word walks, dead stack scrub  |
| `marker`        | root resolution and worklist trace                          |
| `sweeper`       | releasing unmarked blocks                                   |
| `statistics`    | live count/byte totals and debug tag registry               |
| `collector`     | collector state, `initialize`, `allocate`, `collect`        |

*/

pub(crate) mod address_table;
pub(crate) mod block;
pub(crate) mod collector;
pub(crate) mod config;
pub(crate) mod gc_error;
pub(crate) mod marker;
pub(crate) mod stack;
pub(crate) mod statistics;
pub(crate) mod sweeper;

#[cfg(test)]
mod tests;

pub use address_table::{AddressTable, DEFAULT_TABLE_CAPACITY};
pub use block::BLOCK_ALIGN;
pub use collector::{initialize, initialize_with_config, Collector};
pub use config::{CollectorConfig, Diagnostic, DEFAULT_SCRUB_DEPTH_WORDS};
pub use gc_error::GcError;
pub use stack::WORD;
pub use statistics::Statistics;
