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

//! Test writing to an in-process Unix-domain datagram collector.

#[cfg(unix)]
pub fn main() {
    use logstash_tracing::{endpoint::Endpoint, layer::Layer};
    use tracing::{debug, error, info, trace, warn};
    use tracing_subscriber::{
        layer::SubscriberExt, // Needed to get `with()`
        registry::Registry,
    };

    use std::os::unix::net::UnixDatagram;

    // A stand-in collector; clean up any prior run's socket first.
    let path = std::env::temp_dir().join("logstash-test.sock");
    let _ = std::fs::remove_file(&path);
    let socket = UnixDatagram::bind(&path).unwrap();

    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::new(Endpoint::unix_datagram(
        path.to_str().unwrap(),
    )));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, Unix socket.");
    debug!("你好, Unix socket.");
    info!("你好, Unix socket.");
    warn!("你好, Unix socket.");
    error!("你好, Unix socket.");

    let mut buf = [0u8; 8 * 1024];
    for _ in 0..5 {
        let n = socket.recv(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
        println!("collector got: {}", value);
    }

    let _ = std::fs::remove_file(&path);
}

#[cfg(not(unix))]
pub fn main() {
    eprintln!("unix-socket-test only makes sense on Unix");
}
