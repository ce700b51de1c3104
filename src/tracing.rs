// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of logstash-tracing.
//
// logstash-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! Primitives for mapping [`tracing`] entities to log records.
//!
//! [`TracingFormatter`] implementations handle encoding [`Event`]s & [`Span`]s into
//! [`LogRecord`]s. This module provides a single implementation:
//! [`FieldTracingFormatter`], which extracts the "message" field together with every other
//! structured field attached to an [`Event`].
//!
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [`Span`]: https://docs.rs/tracing/0.1.35/tracing/struct.Span.html

use crate::{
    error::Error,
    record::LogRecord,
};

use backtrace::Backtrace;
use serde_json::Value;

use std::collections::BTreeMap;

// When the tracing-log feature is enabled, use NormalizeEvent to extract target/file/line
// metadata from events that originated from the `log` crate. This follows the same pattern
// used by tracing-subscriber's fmt layer.
// See: https://github.com/tokio-rs/tracing/blob/master/tracing-subscriber/src/fmt/fmt_layer.rs
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

type StdResult<T, E> = std::result::Result<T, E>;

/// Map [`tracing`] [`Span`]s & [`Event`]s to [`LogRecord`]s.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
/// [`Span`]: https://docs.rs/tracing/0.1.35/tracing/struct.Span.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// Implementations shall provide methods that will be invoked upon various [`tracing`]
/// occurrences ("span entered", "span exited", "event", and so forth); each method will
/// indicate, firstly, whether the occurrence shall produce a log record for the collector,
/// and if so, what that record shall be. Returning `Ok(None)` suppresses delivery for that
/// occurrence without it being an error.
pub trait TracingFormatter<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error: std::error::Error + Send + Sync + 'static;
    /// An event has occurred
    fn on_event(
        &self,
        event: &tracing::Event,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogRecord>, Self::Error>;
    /// A span with the given ID was entered
    fn on_enter(
        &self,
        _id: &tracing_core::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogRecord>, Self::Error> {
        Ok(Option::None)
    }
    /// A span with the given ID was exited
    fn on_exit(
        &self,
        _id: &tracing_core::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogRecord>, Self::Error> {
        Ok(Option::None)
    }
}

/// A [`TracingFormatter`] that collects an [`Event`]s "message" field (failing if there is
/// none) along with every other structured field, each mapped to the closest JSON type. It
/// doesn't respond to any other occurrences.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// Optionally, callsite metadata can be folded in as additional fields (`target`, `module`,
/// `file` & `line`), for collectors whose queries key on the event's origin:
///
/// ```rust
/// use logstash_tracing::tracing::FieldTracingFormatter;
///
/// let fmtr = FieldTracingFormatter::default()
///     .with_target(true)
///     .with_source_location(true);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FieldTracingFormatter {
    include_target: bool,
    include_module: bool,
    include_source_location: bool,
}

impl FieldTracingFormatter {
    /// Record the event's target under a `target` field.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }
    /// Record the event's module path under a `module` field.
    pub fn with_module(mut self, include: bool) -> Self {
        self.include_module = include;
        self
    }
    /// Record the event's source file & line under `file` & `line` fields.
    pub fn with_source_location(mut self, include: bool) -> Self {
        self.include_source_location = include;
        self
    }
}

struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn new() -> FieldVisitor {
        FieldVisitor {
            message: None,
            fields: BTreeMap::new(),
        }
    }
    // Fields named "log.*" are the `log`-bridge's private metadata; they are surfaced
    // through the normalized callsite metadata instead, so never as event fields.
    fn is_hidden(field: &tracing::field::Field) -> bool {
        field.name().starts_with("log.")
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if !Self::is_hidden(field) {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        if !Self::is_hidden(field) {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if !Self::is_hidden(field) {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        if !Self::is_hidden(field) {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else if !Self::is_hidden(field) {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        if !Self::is_hidden(field) {
            self.fields
                .insert(field.name().to_string(), Value::from(value.to_string()));
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // Regrettably, we have only a `Debug` implementation available to us; but the
            // tracing macros `info!()`, `event!()` & the like all take care to "pre-format"
            // the `message` field so that `value` actually refers to a `std::fmt::Arguments`
            // instance, which will print to a debug format without enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        } else if !Self::is_hidden(field) {
            self.fields
                .insert(field.name().to_string(), Value::from(format!("{:?}", value)));
        }
    }
}

impl<S> TracingFormatter<S> for FieldTracingFormatter
where
    S: tracing_core::subscriber::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error = Error;
    fn on_event(
        &self,
        event: &tracing::Event,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogRecord>, Error> {
        // Events bridged from the `log` crate carry their callsite in "normalized" form;
        // native tracing events report None here & we use the event's own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let message = visitor.message.ok_or(Error::NoMessageField {
            name: event.metadata().name(),
            back: Backtrace::new(),
        })?;

        let mut record = LogRecord::new(*meta.level(), message);
        for (key, value) in visitor.fields {
            record = record.with_field(key, value);
        }
        if self.include_target {
            record = record.with_field("target", meta.target());
        }
        if self.include_module {
            if let Some(module) = meta.module_path() {
                record = record.with_field("module", module);
            }
        }
        if self.include_source_location {
            if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
                record = record.with_field("file", file);
                record = record.with_field("line", line);
            }
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use tracing::Callsite;

    // I confess, `tracing` internals are a bit opaque to me, yet. In addition, they are
    // explicitly unstable. For that reason, I don't want to do too much work, here; just
    // enough to easily give myself Events against which I can test.

    struct TestCallsite {
        metadata: &'static tracing::Metadata<'static>,
    }
    impl tracing_core::callsite::Callsite for TestCallsite {
        fn set_interest(&self, _interest: tracing_core::subscriber::Interest) {}
        fn metadata(&self) -> &tracing::Metadata<'static> {
            self.metadata
        }
    }
    // I *wish* I could deal in TestCallsite instances of arbitrary lifetime, but Identifier
    // needs a reference with 'static duration.
    impl TestCallsite {
        pub const fn new(metadata: &'static tracing::Metadata<'static>) -> TestCallsite {
            TestCallsite { metadata }
        }
    }

    static CALLSITE: TestCallsite = {
        static METADATA: tracing::Metadata = tracing::Metadata::new(
            "test event metadata",
            "test-target",
            tracing::Level::INFO,
            Some(file!()),
            Some(line!()),
            Some(module_path!()),
            tracing::field::FieldSet::new(
                &["message", "user_id", "cached"],
                tracing_core::callsite::Identifier(&CALLSITE),
            ),
            tracing_core::metadata::Kind::EVENT,
        );
        TestCallsite::new(&METADATA)
    };

    #[test]
    fn visitor_collects_message_and_fields() {
        let fields = CALLSITE.metadata().fields();
        let message = fields.field("message").unwrap();
        let user_id = fields.field("user_id").unwrap();
        let cached = fields.field("cached").unwrap();
        let values: [(
            &tracing::field::Field,
            Option<&(dyn tracing::field::Value)>,
        ); 3] = [
            (&message, Some(&"Hello, world!" as &dyn tracing::field::Value)),
            (&user_id, Some(&42_i64 as &dyn tracing::field::Value)),
            (&cached, Some(&true as &dyn tracing::field::Value)),
        ];
        let value_set = fields.value_set(&values);
        let event = tracing::Event::new(CALLSITE.metadata(), &value_set);

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        assert_eq!(visitor.message.as_deref(), Some("Hello, world!"));
        assert_eq!(visitor.fields.get("user_id"), Some(&Value::from(42)));
        assert_eq!(visitor.fields.get("cached"), Some(&Value::from(true)));
    }

    #[test]
    fn missing_message_field_is_an_error() {
        let fields = CALLSITE.metadata().fields();
        let user_id = fields.field("user_id").unwrap();
        let values: [(
            &tracing::field::Field,
            Option<&(dyn tracing::field::Value)>,
        ); 1] = [(&user_id, Some(&42_i64 as &dyn tracing::field::Value))];
        let value_set = fields.value_set(&values);
        let event = tracing::Event::new(CALLSITE.metadata(), &value_set);

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);
        assert!(visitor.message.is_none());
    }
}
