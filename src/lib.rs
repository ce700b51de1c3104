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
//! A [`tracing-subscriber`] [`Layer`] implementation for forwarding [`tracing`] [`Event`]s to
//! a log collector (Logstash, or anything that speaks its `json_lines` codec) over a network
//! or local-domain socket.
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! # Introduction
//!
//! The [`tracing`] crate is a "scoped, structured logging and diagnostics system". It makes a
//! very clear distinction between producers of events & their consumers ([`Subscriber`]s, in
//! [`tracing`] parlance); the [`tracing-subscriber`] crate introduces the notion of a
//! [`Layer`]: a modular implementation of one specific event-handling behavior, "stacked up"
//! with others in a [`Subscriber`] as the application developer desires.
//!
//! [`Subscriber`]: https://docs.rs/tracing/0.1.34/tracing/trait.Subscriber.html
//!
//! This crate provides a [`Layer`] that serializes each event to one line of Logstash-style
//! JSON & writes it, synchronously & without buffering, to a socket: TCP or UDP given a
//! `host:port` address, or (on Unix) a stream, datagram or `SOCK_SEQPACKET` local-domain
//! socket given a filesystem path. The connection is established lazily on the first event,
//! held for reuse across events, & torn down on a failed write so that the next event
//! re-dials. Delivery is best-effort by design: nothing is batched, buffered or retried.
//!
//! # Usage
//!
//! The layer needs to be told where its collector lives; there is no default endpoint:
//!
//! ```rust,no_run
//! use logstash_tracing::{endpoint::Endpoint, layer::Layer};
//! use tracing::info;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! let subscriber =
//!     Registry::default().with(Layer::new(Endpoint::tcp("logstash.internal:5000")));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(user_id = 42, "Hello, world!");
//! ```
//!
//! Will put something like this on the wire (one line, one write):
//!
//! ```json
//! {"@timestamp":"2022-07-01T16:10:55.000000+00:00","@version":"1","host":"bree.local",
//!  "level":"info","message":"Hello, world!","user_id":42}
//! ```
//!
//! The wire format, the event-to-record mapping & the error-surfacing policy are all
//! configurable:
//!
//! ```rust,no_run
//! use logstash_tracing::{
//!     endpoint::Endpoint, hook::DeliveryPolicy, layer::Layer, logstash::Logstash,
//! };
//! use tracing_subscriber::{layer::SubscriberExt, registry::Registry};
//!
//! let formatter = Logstash::builder()
//!     .timestamp_key("time")
//!     .extra_field("service", "api-gateway")
//!     .unwrap()
//!     .build();
//! let subscriber = Registry::default().with(
//!     Layer::with_formatter(Endpoint::unix_datagram("/run/collector.sock"), formatter)
//!         .with_policy(DeliveryPolicy::Lenient),
//! );
//! ```
//!
//! Applications that want delivery failures back as values, rather than a layer that has
//! nowhere to report them, can drive a [`SocketHook`](crate::hook::SocketHook) directly.

pub mod connection;
pub mod endpoint;
pub mod error;
pub mod formatter;
pub mod hook;
pub mod layer;
pub mod logstash;
pub mod record;
pub mod tracing;
