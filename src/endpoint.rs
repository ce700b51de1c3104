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

//! Collector endpoints.
//!
//! An [`Endpoint`] names the log collector: which dial primitive to use ([`SocketKind`]) and
//! where to find it. Both are required at construction (there is no sensible default collector)
//! and neither ever changes over the life of the adapter.
//!
//! # Examples
//!
//! ```rust
//! use logstash_tracing::endpoint::Endpoint;
//!
//! let ep = Endpoint::tcp("logstash.internal:5000");
//! assert_eq!(ep.address(), "logstash.internal:5000");
//! ```

/// The dial primitive used to reach a collector.
///
/// The first two speak IP & take a `host:port` address; the rest speak local-domain sockets &
/// take a filesystem path. The framing each implies (stream versus datagram versus sequenced
/// packet) is handled in [`connection`](crate::connection); nothing else in the crate cares.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocketKind {
    /// Stream over IP
    Tcp,
    /// Datagram over IP
    Udp,
    /// Stream over a local-domain socket
    #[cfg(unix)]
    UnixStream,
    /// Datagram over a local-domain socket
    #[cfg(unix)]
    UnixDatagram,
    /// Sequenced-packet (`SOCK_SEQPACKET`) over a local-domain socket
    #[cfg(target_os = "linux")]
    UnixSeqpacket,
}

impl std::fmt::Display for SocketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SocketKind::Tcp => "tcp",
                SocketKind::Udp => "udp",
                #[cfg(unix)]
                SocketKind::UnixStream => "unix",
                #[cfg(unix)]
                SocketKind::UnixDatagram => "unixgram",
                #[cfg(target_os = "linux")]
                SocketKind::UnixSeqpacket => "unixpacket",
            }
        )
    }
}

/// Where log records are sent: a dial primitive plus an address.
///
/// For [`SocketKind::Tcp`] and [`SocketKind::Udp`] the address must have the form `host:port`;
/// for the local-domain kinds it must be a filesystem path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    kind: SocketKind,
    address: String,
}

impl Endpoint {
    pub fn new<A: Into<String>>(kind: SocketKind, address: A) -> Endpoint {
        Endpoint {
            kind,
            address: address.into(),
        }
    }
    /// A collector reached over a TCP stream at `host:port`.
    pub fn tcp<A: Into<String>>(address: A) -> Endpoint {
        Endpoint::new(SocketKind::Tcp, address)
    }
    /// A collector reached via UDP datagrams at `host:port`.
    pub fn udp<A: Into<String>>(address: A) -> Endpoint {
        Endpoint::new(SocketKind::Udp, address)
    }
    /// A collector reached over a local-domain stream socket at `path`.
    #[cfg(unix)]
    pub fn unix_stream<A: Into<String>>(path: A) -> Endpoint {
        Endpoint::new(SocketKind::UnixStream, path)
    }
    /// A collector reached via local-domain datagrams at `path`.
    #[cfg(unix)]
    pub fn unix_datagram<A: Into<String>>(path: A) -> Endpoint {
        Endpoint::new(SocketKind::UnixDatagram, path)
    }
    /// A collector reached over a local-domain `SOCK_SEQPACKET` socket at `path`.
    #[cfg(target_os = "linux")]
    pub fn unix_seqpacket<A: Into<String>>(path: A) -> Endpoint {
        Endpoint::new(SocketKind::UnixSeqpacket, path)
    }
    pub fn kind(&self) -> SocketKind {
        self.kind
    }
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.address)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn endpoints() {
        let ep = Endpoint::tcp("127.0.0.1:5000");
        assert_eq!(ep.kind(), SocketKind::Tcp);
        assert_eq!(ep.address(), "127.0.0.1:5000");
        assert_eq!(format!("{}", ep), "tcp:127.0.0.1:5000");

        #[cfg(unix)]
        {
            let ep = Endpoint::unix_datagram("/run/collector.sock");
            assert_eq!(ep.kind(), SocketKind::UnixDatagram);
            assert_eq!(format!("{}", ep), "unixgram:/run/collector.sock");
        }
    }
}
