/*!

# Overview

The `log` module provides the collector's diagnostics with customizable thresholds and log levels. The log level
describes what _kind_ of message is logged, and the numeric threshold is a verbosity level, which describes the
_verbosity_ of the logger. The collector itself logs at the following thresholds:

| Threshold | What is logged                                        |
|:----------|:------------------------------------------------------|
| 2         | collector start and stop                              |
| 3         | one summary line per collection pass                  |
| 4         | every freed block, together with its debug tag if any |
| 5         | allocation table growth                               |

Here is a simple example.

```
use marksweep::log::*;

// Set the global threshold to 1. Any messages logged with greater threshold
// will not be emitted.
set_global_logging_threshold(1);

critical!(3, "A critical error occurred!"); // Not emitted
error!(2, "This is an error message.");     // Not emitted
info!(1, "Collection started.");            // Emitted
debug!(0, "Root scan complete.");           // Emitted
```

## Threshold

The global logging threshold is a numerical value, with higher values meaning more verbose logging. This global value
is the same for all levels. Individual log entries are logged "at" a given threshold and are only emitted if their
threshold is _at most_ the global threshold. A message with threshold 0 is always emitted.

```
use marksweep::log::{set_global_logging_threshold, get_global_logging_threshold};

// Show one line per collection pass, but not every freed block.
set_global_logging_threshold(3);
assert_eq!(get_global_logging_threshold(), 3);
```

The threshold can also be supplied through the `MARKSWEEP_LOG_THRESHOLD` environment variable; see
`CollectorConfig::from_env`.

## Levels

Available levels are:  Critical, Error, Warning, Info, Debug, Trace.

# Macros

```ignore
// With threshold and structured fields
level!(threshold; field = value, ...; "format string", args...);

// With threshold
level!(threshold, "format string", args...);

// Without threshold (indicates threshold of 0, always emitted)
level!("format string", args...);
```

Fields whose name ends in `address` are written in hexadecimal by the formatter, so
`trace!(4; address = base; "freed")` prints `address=0x7f...`.

*/
mod formatter;
mod threshold_filter;
mod macros;

use std::sync::{
    atomic::{AtomicU8, Ordering},
    LazyLock
  };

use tracing_subscriber::{
  fmt,
  layer::SubscriberExt,
  Registry
};

use threshold_filter::ThresholdFilterLayer;
use formatter::CustomFieldFormatter;
pub use macros::*;

#[doc(hidden)]
pub use tracing;

/// Used for implicit initialization.
static INIT_LOGGER: LazyLock<()> = LazyLock::new(|| {
  let subscriber = Registry::default()
      .with(ThresholdFilterLayer)
      .with(
        fmt::layer()
            .fmt_fields(CustomFieldFormatter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr),
      );

  // A host program may already have installed its own subscriber, in which case we log through theirs.
  let _ = tracing::subscriber::set_global_default(subscriber);
});

/// This does not need to be called directly. Initializes the logging system.
pub fn init_logger() {
  LazyLock::force(&INIT_LOGGER);
}

/// Default threshold: collector start/stop only.
static GLOBAL_LOGGING_THRESHOLD: AtomicU8 = AtomicU8::new(2);

/// Sets the global threshold.
pub fn set_global_logging_threshold(new_threshold: u8) {
  GLOBAL_LOGGING_THRESHOLD.store(new_threshold, Ordering::SeqCst);
}

/// Retrieves the global threshold.
pub fn get_global_logging_threshold() -> u8 {
  GLOBAL_LOGGING_THRESHOLD.load(Ordering::SeqCst)
}
