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

//! Test writing to an in-process TCP collector.

use logstash_tracing::{endpoint::Endpoint, layer::Layer};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::io::{BufRead, BufReader};
use std::net::TcpListener;

pub fn main() {
    // A stand-in collector on an ephemeral port...
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::new(Endpoint::tcp(addr.to_string())));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, TCP socket.");
    debug!("你好, TCP socket.");
    info!("你好, TCP socket.");
    warn!("你好, TCP socket.");
    error!("你好, TCP socket.");

    let (stream, _) = listener.accept().unwrap();
    let mut reader = BufReader::new(stream);
    for _ in 0..5 {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        println!("collector got: {}", value);
    }
}
