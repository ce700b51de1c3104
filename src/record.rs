// Copyright (C) 2022 Michael Herstine <sp1ff@pobox.com>
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

//! Log records.
//!
//! A [`LogRecord`] is the unit of delivery: severity, message, timestamp & a map of structured
//! fields. Records are produced by a [`TracingFormatter`](crate::tracing::TracingFormatter)
//! implementation from [`tracing`] [`Event`]s, handed to the pipeline, and never mutated
//! thereafter.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use chrono::prelude::*;
use serde_json::Value;

use std::collections::BTreeMap;

/// One log record, ready for serialization.
///
/// Field keys are unique; insertion order is irrelevant (the map is ordered by key). The
/// severity is carried only so the wire format can report it: the delivery pipeline itself
/// never inspects it. Level filtering belongs to the host subscriber stack.
#[derive(Clone, Debug)]
pub struct LogRecord {
    level: tracing::Level,
    message: String,
    timestamp: DateTime<Utc>,
    fields: BTreeMap<String, Value>,
}

impl LogRecord {
    /// A record stamped with the current time & no structured fields.
    pub fn new<M: Into<String>>(level: tracing::Level, message: M) -> LogRecord {
        LogRecord {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            fields: BTreeMap::new(),
        }
    }

    /// Replace the capture timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> LogRecord {
        self.timestamp = timestamp;
        self
    }

    /// Attach a structured field. A later value for the same key wins.
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> LogRecord {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn level(&self) -> tracing::Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// The severity name used on the wire. `WARN` maps to "warning", matching the names
    /// long-established by syslog-descended collectors.
    pub fn level_str(&self) -> &'static str {
        match &self.level {
            &tracing::Level::TRACE => "trace",
            &tracing::Level::DEBUG => "debug",
            &tracing::Level::INFO => "info",
            &tracing::Level::WARN => "warning",
            &tracing::Level::ERROR => "error",
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(LogRecord::new(tracing::Level::WARN, "x").level_str(), "warning");
        assert_eq!(LogRecord::new(tracing::Level::ERROR, "x").level_str(), "error");
        assert_eq!(LogRecord::new(tracing::Level::TRACE, "x").level_str(), "trace");
    }

    #[test]
    fn later_field_wins() {
        let record = LogRecord::new(tracing::Level::INFO, "x")
            .with_field("attempt", 1)
            .with_field("attempt", 2);
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].1, &Value::from(2));
    }
}
