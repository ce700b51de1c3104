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

//! Test writing to an in-process UDP collector.

use logstash_tracing::{endpoint::Endpoint, layer::Layer};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::net::UdpSocket;

pub fn main() {
    // A stand-in collector on an ephemeral port...
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();

    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::new(Endpoint::udp(addr.to_string())));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, UDP socket.");
    debug!("你好, UDP socket.");
    info!("你好, UDP socket.");
    warn!("你好, UDP socket.");
    error!("你好, UDP socket.");

    let mut buf = [0u8; 8 * 1024];
    for _ in 0..5 {
        let n = socket.recv(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
        println!("collector got: {}", value);
    }
}
