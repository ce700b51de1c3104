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

//! Connection lifecycle for the collector socket.
//!
//! [`ConnectionManager`] owns the one outbound socket this crate will ever hold: it dials on
//! demand, hands out the live handle for writes, and tears it down when a write fails so that
//! the next delivery re-dials rather than writing to a known-broken connection.
//!
//! The manager never retries a dial on its own; retry is driven entirely by the next call to
//! [`ensure_connected`](ConnectionManager::ensure_connected). Connections are never pooled:
//! a log hook has a single writer & a single destination, so there is exactly one connection
//! slot per adapter instance.
//!
//! # Examples
//!
//! Dialing an address nobody is listening on fails, and keeps failing, without wedging the
//! manager:
//!
//! ```rust
//! use logstash_tracing::connection::ConnectionManager;
//! use logstash_tracing::endpoint::Endpoint;
//!
//! let mut manager = ConnectionManager::new(Endpoint::tcp("127.0.0.1:0"));
//! assert!(manager.ensure_connected().is_err());
//! assert!(manager.ensure_connected().is_err()); // no panic, state still absent
//! assert!(!manager.is_connected());
//! ```

use crate::{
    endpoint::{Endpoint, SocketKind},
    error::{Error, Result},
};

use backtrace::Backtrace;

use std::{
    io,
    io::Write,
    net::{TcpStream, UdpSocket},
};

#[cfg(unix)]
use std::{
    os::unix::net::{UnixDatagram, UnixStream},
    path::Path,
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       live connections                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A live, writable handle to the collector.
///
/// One variant per [`SocketKind`]. Stream kinds write & flush; datagram & sequenced-packet
/// kinds send each payload as one packet. Closing is handled by `Drop` and is best-effort:
/// close errors are ignored by construction.
pub enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
    #[cfg(unix)]
    UnixStream(UnixStream),
    #[cfg(unix)]
    UnixDatagram(UnixDatagram),
    #[cfg(target_os = "linux")]
    UnixSeqpacket(socket2::Socket),
}

impl Connection {
    /// Dial `endpoint` with the primitive its kind calls for.
    fn dial(endpoint: &Endpoint) -> io::Result<Connection> {
        match endpoint.kind() {
            SocketKind::Tcp => TcpStream::connect(endpoint.address()).map(Connection::Tcp),
            SocketKind::Udp => {
                // Bind to any available port on any interface, then connect to the
                // collector so plain `send` works thereafter.
                let socket = UdpSocket::bind("0.0.0.0:0")?;
                socket.connect(endpoint.address())?;
                Ok(Connection::Udp(socket))
            }
            #[cfg(unix)]
            SocketKind::UnixStream => {
                UnixStream::connect(Path::new(endpoint.address())).map(Connection::UnixStream)
            }
            #[cfg(unix)]
            SocketKind::UnixDatagram => {
                let socket = UnixDatagram::unbound()?;
                socket.connect(Path::new(endpoint.address()))?;
                Ok(Connection::UnixDatagram(socket))
            }
            #[cfg(target_os = "linux")]
            SocketKind::UnixSeqpacket => {
                let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::SEQPACKET, None)?;
                socket.connect(&socket2::SockAddr::unix(Path::new(endpoint.address()))?)?;
                Ok(Connection::UnixSeqpacket(socket))
            }
        }
    }

    /// Put all of `buf` on the wire.
    fn send_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Connection::Tcp(socket) => {
                socket.write_all(buf)?;
                socket.flush()
            }
            Connection::Udp(socket) => socket.send(buf).map(|_| ()),
            #[cfg(unix)]
            Connection::UnixStream(socket) => {
                socket.write_all(buf)?;
                socket.flush()
            }
            #[cfg(unix)]
            Connection::UnixDatagram(socket) => socket.send(buf).map(|_| ()),
            #[cfg(target_os = "linux")]
            Connection::UnixSeqpacket(socket) => socket.send(buf).map(|_| ()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                    struct ConnectionManager                                    //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Owner of the single connection slot.
///
/// The lifecycle is `absent → established` on the first successful
/// [`ensure_connected`](ConnectionManager::ensure_connected), then `established → absent` again
/// on [`reset`](ConnectionManager::reset). A healthy connection is reused across any number of
/// writes; nothing here ever re-dials behind the caller's back.
///
/// The manager itself is not synchronized; callers that share one across threads must
/// serialize access (see [`SocketHook`](crate::hook::SocketHook), which holds its manager
/// behind a mutex for the whole ensure-write-reset span).
pub struct ConnectionManager {
    endpoint: Endpoint,
    conn: Option<Connection>,
}

impl ConnectionManager {
    /// A manager for `endpoint`. Does not dial.
    pub fn new(endpoint: Endpoint) -> ConnectionManager {
        ConnectionManager {
            endpoint,
            conn: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Dial iff no live connection is held; hand back the live handle.
    ///
    /// On dial failure the slot stays empty & the error is [`Error::Dial`]; calling again
    /// simply dials again.
    pub fn ensure_connected(&mut self) -> Result<&mut Connection> {
        if self.conn.is_none() {
            self.conn = Some(Connection::dial(&self.endpoint).map_err(|err| Error::Dial {
                source: Box::new(err),
                back: Backtrace::new(),
            })?);
        }
        Ok(self.conn.as_mut().expect("connection slot was just filled"))
    }

    /// Tear down the connection, if any. Idempotent.
    ///
    /// Closing happens through `Drop`; close errors are ignored, per the contract that
    /// teardown is best-effort cleanup only.
    pub fn reset(&mut self) {
        self.conn = None;
    }

    /// Write all of `payload` through the held connection.
    ///
    /// Requires an established connection (call
    /// [`ensure_connected`](ConnectionManager::ensure_connected) first). Any I/O error,
    /// partial writes included, comes back as [`Error::Write`]; deciding whether to
    /// [`reset`](ConnectionManager::reset) in response belongs to the caller.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        match self.conn {
            Some(ref mut conn) => conn.send_all(payload).map_err(|err| Error::Write {
                source: Box::new(err),
                back: Backtrace::new(),
            }),
            None => Err(Error::Write {
                source: Box::new(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no connection established",
                )),
                back: Backtrace::new(),
            }),
        }
    }
}
