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

//! The delivery pipeline.
//!
//! [`SocketHook`] is the programmatic entry point to this crate: hand it a
//! [`LogRecord`] & it will serialize it & put the bytes on the wire, dialing the collector if
//! need be & tearing the connection down on a failed write so the next delivery re-dials.
//! [`Layer`](crate::layer::Layer) is a thin adapter that feeds this from `tracing`'s
//! dispatch; anything else (a different logging framework, a test harness) can call
//! [`deliver`](SocketHook::deliver) directly.
//!
//! Delivery is strictly best-effort & synchronous: no batching, no buffering, no backoff, no
//! re-queue of a failed payload. The one concession to transient failure is that a failed
//! write resets the connection, so the *next* delivery attempts a fresh dial.

use crate::{
    connection::ConnectionManager,
    endpoint::Endpoint,
    error::{Error, Result},
    formatter::RecordFormatter,
    record::LogRecord,
};

use backtrace::Backtrace;
use parking_lot::Mutex;

/// Policy for surfacing connect-time failures to the log producer.
///
/// Both behaviors exist in the wild: some deployments want a dead collector to be loud
/// (fail the caller), some want logging to be invisible however broken the network is.
/// The default is [`Strict`](DeliveryPolicy::Strict); swallowing is an explicit opt-in.
///
/// Only dial failures are governed by this policy. Serialization failures & write failures
/// surface regardless: the former mean the record can never be delivered, the latter must be
/// observable so callers can react to a connection going bad.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DeliveryPolicy {
    /// Dial failures surface to the caller as [`Error::Dial`]
    #[default]
    Strict,
    /// Dial failures are swallowed; the record is silently dropped
    Lenient,
}

/// A socket-delivery hook: one formatter, one policy, one connection slot.
///
/// The connection manager sits behind a mutex held for the whole
/// ensure-connected/write/reset-on-failure span, so concurrent deliveries cannot duplicate a
/// dial, write to a just-reset handle, or end up holding two live connections. Serialization
/// happens before the lock is taken; a formatter failure leaves the connection state
/// untouched.
pub struct SocketHook<F: RecordFormatter> {
    formatter: F,
    policy: DeliveryPolicy,
    manager: Mutex<ConnectionManager>,
}

impl<F: RecordFormatter> SocketHook<F> {
    /// A hook delivering to `endpoint`. Does not dial; the first delivery (or
    /// [`preconnect`](SocketHook::preconnect)) does.
    pub fn new(endpoint: Endpoint, formatter: F) -> SocketHook<F> {
        SocketHook {
            formatter,
            policy: DeliveryPolicy::default(),
            manager: Mutex::new(ConnectionManager::new(endpoint)),
        }
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> SocketHook<F> {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.manager.lock().is_connected()
    }

    /// Dial now rather than on first delivery. Failures surface as [`Error::Dial`]
    /// regardless of policy; an explicit request to connect is not a delivery.
    pub fn preconnect(&self) -> Result<()> {
        self.manager.lock().ensure_connected().map(|_| ())
    }

    /// Serialize `record` & write it to the collector.
    ///
    /// Exactly one write per record, on the caller's thread, before this returns. On a failed
    /// write the connection is reset, then [`Error::Write`] propagates; the payload is not
    /// retried.
    pub fn deliver(&self, record: &LogRecord) -> Result<()> {
        let payload = self.formatter.format(record).map_err(|err| Error::Format {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;

        let mut manager = self.manager.lock();
        if let Err(err) = manager.ensure_connected() {
            return match self.policy {
                DeliveryPolicy::Strict => Err(err),
                DeliveryPolicy::Lenient => Ok(()),
            };
        }
        manager.write(&payload).map_err(|err| {
            manager.reset();
            err
        })
    }
}
