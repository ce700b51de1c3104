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

//! Logstash-style JSON event formatting.
//!
//! [`Logstash`] is a [`RecordFormatter`] that renders each [`LogRecord`] as one line of JSON in
//! the shape Logstash's `json_lines` codec expects:
//!
//! ```json
//! {"@timestamp":"2022-07-01T16:10:55.000000+00:00","@version":"1","host":"bree.local",
//!  "level":"info","message":"Hello, world!","user_id":42}
//! ```
//!
//! The timestamp & message keys can be renamed, and a set of static fields can be merged into
//! every event, for collectors whose ingest pipelines expect different names:
//!
//! ```rust
//! use logstash_tracing::logstash::Logstash;
//!
//! let formatter = Logstash::builder()
//!     .timestamp_key("time")
//!     .message_key("msg")
//!     .extra_field("service", "api-gateway")
//!     .unwrap()
//!     .build();
//! ```
//!
//! An event field whose key collides with one already emitted (the reserved keys above, or a
//! static field) is kept under `fields.<key>` rather than clobbering it.

use crate::{
    error::{Error, Result},
    formatter::RecordFormatter,
    record::LogRecord,
};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::{Map, Value};

use std::collections::BTreeMap;

type StdResult<T, E> = std::result::Result<T, E>;

/// Figure-out the value for the `host` field.
///
/// The order of preference is the machine's hostname, then a local IP address, then `-`. This
/// mirrors the fallback chain syslog formatters use for their HOSTNAME field; Logstash itself
/// attaches no semantics to the value beyond "identifies the origin host".
fn default_host() -> String {
    match hostname::get().ok().and_then(|name| name.into_string().ok()) {
        Some(name) => name,
        None => local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| String::from("-")),
    }
}

/// A formatter that produces Logstash `json_lines` events.
///
/// Each payload is a single self-contained JSON document terminated by a newline, so the same
/// bytes frame correctly whether the endpoint is a stream or a datagram socket.
pub struct Logstash {
    timestamp_key: String,
    message_key: String,
    host: String,
    extra_fields: BTreeMap<String, Value>,
}

impl std::default::Default for Logstash {
    /// `@timestamp` & `message` keys, discovered hostname, no static fields.
    fn default() -> Self {
        Logstash {
            timestamp_key: String::from("@timestamp"),
            message_key: String::from("message"),
            host: default_host(),
            extra_fields: BTreeMap::new(),
        }
    }
}

pub struct LogstashBuilder {
    imp: Logstash,
}

impl LogstashBuilder {
    /// Rename the key under which the capture timestamp is emitted.
    pub fn timestamp_key<K: Into<String>>(mut self, key: K) -> Self {
        self.imp.timestamp_key = key.into();
        self
    }
    /// Rename the key under which the message is emitted.
    pub fn message_key<K: Into<String>>(mut self, key: K) -> Self {
        self.imp.message_key = key.into();
        self
    }
    pub fn host_as_string(mut self, host: String) -> Self {
        self.imp.host = host;
        self
    }
    /// Merge a static field into every event. The value may be anything serializable.
    pub fn extra_field<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|err| Error::Format {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        self.imp.extra_fields.insert(key.into(), value);
        Ok(self)
    }
    pub fn build(self) -> Logstash {
        self.imp
    }
}

impl Logstash {
    pub fn builder() -> LogstashBuilder {
        LogstashBuilder {
            imp: Logstash::default(),
        }
    }
}

/// Insert `key`, keeping it under `fields.<key>` if something already claimed the name.
fn insert_or_prefix(map: &mut Map<String, Value>, key: &str, value: Value) {
    if map.contains_key(key) {
        map.insert(format!("fields.{}", key), value);
    } else {
        map.insert(key.to_string(), value);
    }
}

impl RecordFormatter for Logstash {
    type Error = Error;
    type Output = Bytes;

    fn format(&self, record: &LogRecord) -> StdResult<Bytes, Error> {
        let mut map = Map::new();
        map.insert(
            self.timestamp_key.clone(),
            // Fractional seconds are capped at six digits; some collectors refuse
            // greater precision.
            Value::String(
                record
                    .timestamp()
                    .to_rfc3339_opts(SecondsFormat::Micros, false),
            ),
        );
        map.insert(String::from("@version"), Value::String(String::from("1")));
        map.insert(String::from("host"), Value::String(self.host.clone()));
        map.insert(
            String::from("level"),
            Value::String(String::from(record.level_str())),
        );
        map.insert(
            self.message_key.clone(),
            Value::String(String::from(record.message())),
        );
        for (key, value) in &self.extra_fields {
            insert_or_prefix(&mut map, key, value.clone());
        }
        for (key, value) in record.fields() {
            insert_or_prefix(&mut map, key, value.clone());
        }

        let mut writer = BytesMut::new().writer();
        serde_json::to_writer(&mut writer, &map).map_err(|err| Error::Format {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        let mut buf = writer.into_inner();
        buf.put_u8(b'\n');
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use chrono::prelude::*;

    fn epoch_record(message: &str) -> LogRecord {
        LogRecord::new(tracing::Level::INFO, message)
            .with_timestamp(DateTime::<Utc>::from(std::time::UNIX_EPOCH))
    }

    fn fixed_formatter() -> Logstash {
        Logstash::builder()
            .host_as_string("bree.local".to_string())
            .build()
    }

    #[test]
    fn golden_event() {
        let buf = fixed_formatter().format(&epoch_record("Hello, world!")).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"@timestamp\":\"1970-01-01T00:00:00.000000+00:00\",\"@version\":\"1\",\
             \"host\":\"bree.local\",\"level\":\"info\",\"message\":\"Hello, world!\"}\n"
        );
    }

    #[test]
    fn non_ascii_messages_pass_through() {
        let buf = fixed_formatter().format(&epoch_record("Hello, 世界!")).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"@timestamp\":\"1970-01-01T00:00:00.000000+00:00\",\"@version\":\"1\",\
             \"host\":\"bree.local\",\"level\":\"info\",\"message\":\"Hello, 世界!\"}\n"
        );
    }

    #[test]
    fn renamed_keys() {
        let f = Logstash::builder()
            .timestamp_key("time")
            .message_key("msg")
            .host_as_string("bree.local".to_string())
            .build();
        let buf = f.format(&epoch_record("Hello, world!")).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"@version\":\"1\",\"host\":\"bree.local\",\"level\":\"info\",\
             \"msg\":\"Hello, world!\",\"time\":\"1970-01-01T00:00:00.000000+00:00\"}\n"
        );
    }

    #[test]
    fn event_fields_and_statics() {
        let f = Logstash::builder()
            .host_as_string("bree.local".to_string())
            .extra_field("service", "api-gateway")
            .unwrap()
            .build();
        let record = epoch_record("Hello, world!")
            .with_field("user_id", 42)
            .with_field("cached", true);
        let buf = f.format(&record).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"@timestamp\":\"1970-01-01T00:00:00.000000+00:00\",\"@version\":\"1\",\
             \"cached\":true,\"host\":\"bree.local\",\"level\":\"info\",\
             \"message\":\"Hello, world!\",\"service\":\"api-gateway\",\"user_id\":42}\n"
        );
    }

    #[test]
    fn colliding_field_keys_are_prefixed() {
        let record = epoch_record("Hello, world!").with_field("message", "shadow");
        let buf = fixed_formatter().format(&record).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf).unwrap(),
            "{\"@timestamp\":\"1970-01-01T00:00:00.000000+00:00\",\"@version\":\"1\",\
             \"fields.message\":\"shadow\",\"host\":\"bree.local\",\"level\":\"info\",\
             \"message\":\"Hello, world!\"}\n"
        );
    }

    #[test]
    fn fractional_seconds_capped_at_six_digits() {
        let record = LogRecord::new(tracing::Level::INFO, "tick");
        let buf = fixed_formatter().format(&record).unwrap();
        let text = std::str::from_utf8(&buf).unwrap();
        let i = text.find('.').unwrap();
        let j = text[i..].find('+').unwrap();
        assert!(j - 1 <= 6, "Fractional seconds should not exceed 6 digits");
    }

    #[test]
    fn default_host_is_populated() {
        // Whatever the environment, the chain must bottom out in *something*.
        assert!(!default_host().is_empty());
    }
}
