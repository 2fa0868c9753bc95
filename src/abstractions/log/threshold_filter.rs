use std::fmt::Debug;
use tracing::{
  field::{Field, Visit},
  Event,
  Subscriber
};
use tracing_subscriber::{
  Layer,
  layer::Context,
  registry::LookupSpan
};

use super::get_global_logging_threshold;

/// A layer that only lets through events logged at or below the global logging threshold.
pub(crate) struct ThresholdFilterLayer;

impl<S> Layer<S> for ThresholdFilterLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
  fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
    let mut visitor = ThresholdVisitor { threshold: None };
    event.record(&mut visitor);

    // Events without a threshold (e.g. from a host program's own `tracing` calls) are treated as threshold 0.
    match visitor.threshold {
      Some(threshold) => threshold <= get_global_logging_threshold(),
      None            => true
    }
  }
}

/// Extracts the `threshold` field from an event.
struct ThresholdVisitor {
  threshold: Option<u8>,
}

impl Visit for ThresholdVisitor {
  fn record_i64(&mut self, field: &Field, value: i64) {
    if field.name() == "threshold" {
      match u8::try_from(value) {
        Ok(threshold) => self.threshold = Some(threshold),
        Err(_)        => panic!("Invalid threshold value supplied to the logger: {:?}", value),
      }
    }
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    if field.name() == "threshold" {
      match u8::try_from(value) {
        Ok(threshold) => self.threshold = Some(threshold),
        Err(_)        => panic!("Invalid threshold value supplied to the logger: {:?}", value),
      }
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
    if field.name() == "threshold" {
      panic!("Invalid threshold value supplied to the logger: {:?}", value);
    }
  }

}
