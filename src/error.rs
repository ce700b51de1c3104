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
//! [logstash-tracing](crate) errors

use backtrace::Backtrace;

/// [logstash-tracing](crate) error type
///
/// [logstash-tracing](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis of what the caller
/// will need to respond. In particular, a caller that wants to re-invoke a failed delivery
/// needs to distinguish "the record could not be serialized" (re-invoking is pointless) from
/// "the collector could not be reached" (re-invoking will re-dial).
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// Connect-time failure (refused, unreachable, permission denied, path not found)
    Dial {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A record could not be serialized to its wire form
    Format {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// An Event had no message field
    NoMessageField {
        name: &'static str,
        back: Backtrace,
    },
    /// Mid-write failure on an established connection (broken pipe, connection reset)
    Write {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Dial { source, .. } => {
                write!(f, "While dialing the collector, got {}", source)
            }
            Error::Format { source, .. } => {
                write!(f, "While serializing a log record, got {}", source)
            }
            Error::NoMessageField { name, .. } => write!(
                f,
                "Event '{}' had no message field, and so was not forwarded to the collector",
                name
            ),
            Error::Write { source, .. } => {
                write!(f, "While writing to the collector, got {}", source)
            }
            _ => write!(f, "Other logstash-tracing error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Dial { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Format { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::NoMessageField { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Write { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "logstash-tracing error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
