/*!
Field formatting for collector events. The message comes first, followed by `name=value` pairs. Bookkeeping fields
(`threshold`, `critical`) are consumed rather than printed, and fields whose name ends in `address` are printed in
hexadecimal.
*/

use std::fmt::{Debug, Display};

use tracing::field::{Field, Visit};
use tracing_subscriber::{
  field::RecordFields,
  fmt::{
    format::Writer,
    FormatFields
  }
};

pub(crate) struct CustomFieldFormatter;

impl<'writer> FormatFields<'writer> for CustomFieldFormatter {
  fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> std::fmt::Result {
    let mut visitor = EventFieldWriter { writer };
    fields.record(&mut visitor);
    Ok(())
  }
}

enum FieldRole {
  Message,
  Critical,
  Hidden,
  Address,
  Plain,
}

impl FieldRole {
  fn of(field: &Field) -> FieldRole {
    match field.name() {
      "message"                          => FieldRole::Message,
      "critical"                         => FieldRole::Critical,
      "threshold"                        => FieldRole::Hidden,
      name if name.ends_with("address")  => FieldRole::Address,
      _                                  => FieldRole::Plain,
    }
  }
}

struct EventFieldWriter<'writer> {
  writer: Writer<'writer>,
}

impl EventFieldWriter<'_> {
  fn plain(&mut self, field: &Field, value: impl Display) {
    let _ = write!(self.writer, "{}={} ", field.name(), value);
  }
}

impl Visit for EventFieldWriter<'_> {
  fn record_i64(&mut self, field: &Field, value: i64) {
    match FieldRole::of(field) {
      FieldRole::Hidden | FieldRole::Critical => {}
      _ => self.plain(field, value),
    }
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    match FieldRole::of(field) {
      FieldRole::Hidden | FieldRole::Critical => {}
      FieldRole::Address => {
        let _ = write!(self.writer, "{}={:#x} ", field.name(), value);
      }
      _ => self.plain(field, value),
    }
  }

  fn record_bool(&mut self, field: &Field, value: bool) {
    match FieldRole::of(field) {
      FieldRole::Critical if value => {
        let _ = write!(self.writer, "[CRITICAL] ");
      }
      FieldRole::Critical | FieldRole::Hidden => {}
      _ => self.plain(field, value),
    }
  }

  fn record_str(&mut self, field: &Field, value: &str) {
    match FieldRole::of(field) {
      FieldRole::Message => {
        let _ = write!(self.writer, "{} ", value);
      }
      FieldRole::Hidden => {}
      _ => {
        let _ = write!(self.writer, "{}={:?} ", field.name(), value);
      }
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
    match FieldRole::of(field) {
      // `format_args!` messages arrive here; their `Debug` is their text.
      FieldRole::Message => {
        let _ = write!(self.writer, "{:?} ", value);
      }
      FieldRole::Critical => {
        let _ = write!(self.writer, "[CRITICAL] ");
      }
      FieldRole::Hidden => {}
      _ => {
        let _ = write!(self.writer, "{}={:?} ", field.name(), value);
      }
    }
  }
}
