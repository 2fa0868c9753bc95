/*!

Collector configuration. The defaults reproduce the plain behavior: a 32 slot table, no statistics table, freed
blocks reported at trace level. `CollectorConfig::from_env` lets a host override the logging related settings without
recompiling:

| Variable                    | Effect                                           |
|:----------------------------|:-------------------------------------------------|
| `MARKSWEEP_SHOW_STATISTICS` | `1`/`true` logs a statistics table per pass      |
| `MARKSWEEP_LOG_THRESHOLD`   | sets the global logging threshold (`0`-`255`)    |

*/

use enumflags2::{bitflags, make_bitflags, BitFlags};
use once_cell::sync::Lazy;

use crate::core::address_table::DEFAULT_TABLE_CAPACITY;

/// Default number of dead stack words zeroed before each scan.
pub const DEFAULT_SCRUB_DEPTH_WORDS: usize = 1024;

/// Read once, the first time a collector is initialized without an explicit configuration.
pub(crate) static DEFAULT_CONFIG: Lazy<CollectorConfig> = Lazy::new(CollectorConfig::from_env);

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Diagnostic {
  /// Log every freed block.
  ReportFrees     = 1 << 0,
  /// Include the debug tag, if any, when reporting a freed block.
  ReportTags      = 1 << 1,
  /// Verify table consistency after every sweep. Only effective with the `gc_debug` feature. Off by default.
  CheckInvariants = 1 << 2,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectorConfig {
  pub initial_table_capacity: usize,
  pub show_gc_statistics    : bool,
  pub scrub_depth_words     : usize,
  pub diagnostics           : BitFlags<Diagnostic>,
  /// Applied to the global logging threshold when a collector starts.
  pub log_threshold         : Option<u8>,
}

impl Default for CollectorConfig {
  fn default() -> Self {
    CollectorConfig {
      initial_table_capacity: DEFAULT_TABLE_CAPACITY,
      show_gc_statistics    : false,
      scrub_depth_words     : DEFAULT_SCRUB_DEPTH_WORDS,
      diagnostics           : make_bitflags!(Diagnostic::{ReportFrees | ReportTags}),
      log_threshold         : None,
    }
  }
}

impl CollectorConfig {
  /// The default configuration with overrides read from the environment. Unparsable values are ignored.
  pub fn from_env() -> Self {
    let mut config = CollectorConfig::default();

    if let Ok(value) = std::env::var("MARKSWEEP_SHOW_STATISTICS") {
      config.show_gc_statistics = parse_flag(&value);
    }
    if let Ok(value) = std::env::var("MARKSWEEP_LOG_THRESHOLD") {
      config.log_threshold = value.trim().parse::<u8>().ok();
    }

    config
  }

  pub fn with_initial_table_capacity(mut self, capacity: usize) -> Self {
    assert!(capacity > 0, "the allocation table needs at least one slot");
    self.initial_table_capacity = capacity;
    self
  }

  pub fn with_gc_statistics(mut self, show: bool) -> Self {
    self.show_gc_statistics = show;
    self
  }

  pub fn with_scrub_depth_words(mut self, words: usize) -> Self {
    self.scrub_depth_words = words;
    self
  }

  pub fn with_diagnostics(mut self, diagnostics: BitFlags<Diagnostic>) -> Self {
    self.diagnostics = diagnostics;
    self
  }

  pub fn with_log_threshold(mut self, threshold: u8) -> Self {
    self.log_threshold = Some(threshold);
    self
  }
}

fn parse_flag(value: &str) -> bool {
  matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
