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

//! [logstash-tracing](crate) [`Layer`] implementations.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! A basic struct [`Layer`] is defined, with convenience constructors for the common
//! configuration (Logstash JSON over the given endpoint). Consumers of this crate are of
//! course free to implement the [`RecordFormatter`] & [`TracingFormatter`] traits for
//! themselves & provide their own implementations.

use crate::{
    endpoint::Endpoint,
    error::Result,
    formatter::RecordFormatter,
    hook::{DeliveryPolicy, SocketHook},
    logstash::Logstash,
    tracing::{FieldTracingFormatter, TracingFormatter},
};

use tracing::Event;
use tracing_subscriber::layer::Context;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will forward [`Event`]s
/// to a log collector over a socket.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// The layer accepts every severity ([`enabled`] is unconditionally `true`): level filtering
/// is the business of the host subscriber stack, which would otherwise pre-filter on this
/// layer's behalf. Delivery failures cannot be returned from [`on_event`], so they are
/// reported once to stderr; callers that need the full error taxonomy should drive a
/// [`SocketHook`] directly.
///
/// [`enabled`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html#method.enabled
/// [`on_event`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html#method.on_event
pub struct Layer<S, F1: RecordFormatter, F2: TracingFormatter<S>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    hook: SocketHook<F1>,
    tracing_formatter: F2,
    // I need the Subscriber implementation type as a type parameter to transmit it to the
    // TracingFormatter trait. 👇 gets the compiler to shut-up about unused type parameters.
    subscriber_type: std::marker::PhantomData<S>,
}

/// A [`Layer`] with the default characteristics:
///
/// - Collects the message plus every structured field from each event
/// - Formats records as Logstash `json_lines` JSON
/// - Surfaces dial failures ([`DeliveryPolicy::Strict`])
///
/// May be used with any [`tracing_subscriber::Subscriber`] implementation that supports
/// [`LookupSpan`].
///
/// [`tracing_subscriber::Subscriber`]: https://docs.rs/tracing/latest/tracing/trait.Subscriber.html
/// [`LookupSpan`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/registry/trait.LookupSpan.html
impl<S> Layer<S, Logstash, FieldTracingFormatter>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// A layer forwarding Logstash JSON lines to the collector at `endpoint`.
    ///
    /// There is no default endpoint; transport kind & address are both yours to supply. The
    /// collector is not dialed here: the first event delivered (or
    /// [`preconnect`](Layer::preconnect)) establishes the connection.
    pub fn new(endpoint: Endpoint) -> Self {
        Layer {
            hook: SocketHook::new(endpoint, Logstash::default()),
            tracing_formatter: FieldTracingFormatter::default(),
            subscriber_type: std::marker::PhantomData,
        }
    }

    /// A layer forwarding to `endpoint` with a custom-configured [`Logstash`] formatter.
    pub fn with_formatter(endpoint: Endpoint, formatter: Logstash) -> Self {
        Layer {
            hook: SocketHook::new(endpoint, formatter),
            tracing_formatter: FieldTracingFormatter::default(),
            subscriber_type: std::marker::PhantomData,
        }
    }
}

impl<S, F1, F2> Layer<S, F1, F2>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F1: RecordFormatter,
    F2: TracingFormatter<S>,
{
    /// Construct a layer with custom inners.
    pub fn with_formatters(endpoint: Endpoint, formatter: F1, tracing_formatter: F2) -> Self {
        Layer {
            hook: SocketHook::new(endpoint, formatter),
            tracing_formatter,
            subscriber_type: std::marker::PhantomData,
        }
    }

    /// Choose how dial failures are surfaced (default [`DeliveryPolicy::Strict`]).
    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.hook = self.hook.with_policy(policy);
        self
    }

    /// Dial the collector now instead of on the first event.
    pub fn preconnect(self) -> Result<Self> {
        self.hook.preconnect()?;
        Ok(self)
    }
}

/// This is the Big Tuna-- the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, F1, F2> tracing_subscriber::layer::Layer<S> for Layer<S, F1, F2>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F1: RecordFormatter + 'static,
    F2: TracingFormatter<S> + 'static,
{
    fn enabled(&self, _metadata: &tracing::Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Accept everything; severity is the subscriber stack's concern, not the wire's.
        true
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        match self.tracing_formatter.on_event(event, ctx) {
            Ok(Some(record)) => {
                if let Err(err) = self.hook.deliver(&record) {
                    // There is nowhere to return this from a Layer, & emitting it through
                    // `tracing` would re-enter this very layer.
                    eprintln!("logstash-tracing: failed to forward event: {}", err);
                }
            }
            Ok(None) => {}
            Err(err) => eprintln!("logstash-tracing: {}", err),
        }
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use tracing::info;
    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    use std::io::{BufRead, BufReader};

    #[test]
    fn events_arrive_as_json_lines_over_tcp() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let layer = Layer::with_formatter(
            Endpoint::tcp(addr.to_string()),
            Logstash::builder()
                .host_as_string("bree.local".to_string())
                .build(),
        );
        let subscriber = Registry::default().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        info!(user_id = 42, "Hello, world!");

        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["@version"], "1");
        assert_eq!(value["host"], "bree.local");
        assert_eq!(value["level"], "info");
        assert_eq!(value["message"], "Hello, world!");
        assert_eq!(value["user_id"], 42);
    }

    #[cfg(unix)]
    #[test]
    fn events_arrive_over_unix_datagrams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.sock");
        let listener = std::os::unix::net::UnixDatagram::bind(&path).unwrap();

        let layer = Layer::new(Endpoint::unix_datagram(path.to_str().unwrap()));
        let subscriber = Registry::default().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        info!("你好, datagram socket.");

        let mut buf = [0u8; 8 * 1024];
        let n = listener.recv(&mut buf).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&buf[..n - 1]).unwrap(); // trailing newline
        assert_eq!(value["message"], "你好, datagram socket.");
    }

    #[test]
    fn callsite_metadata_can_be_folded_in() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let layer = Layer::with_formatters(
            Endpoint::tcp(addr.to_string()),
            Logstash::default(),
            FieldTracingFormatter::default()
                .with_target(true)
                .with_source_location(true),
        );
        let subscriber = Registry::default().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        info!("annotated");

        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["target"], "logstash_tracing::layer::smoke");
        assert_eq!(value["file"], file!());
        assert!(value["line"].is_u64());
    }

    #[cfg(unix)]
    #[test]
    fn a_dead_collector_does_not_take_the_caller_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nobody-home.sock");

        let layer = Layer::new(Endpoint::unix_stream(path.to_str().unwrap()))
            .with_policy(DeliveryPolicy::Lenient);
        let subscriber = Registry::default().with(layer);
        let _guard = tracing::subscriber::set_default(subscriber);

        // Must neither panic nor block; the records are silently dropped.
        info!("into the void");
        info!("still here");
    }
}
