// Copyright (C) 2022 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of syslog-relay.
//
// syslog-relay is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! [syslog-relay](crate) errors

use backtrace::Backtrace;

/// [syslog-relay](crate) error type
///
/// [syslog-relay](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to repond. Configuration variants are surfaced from constructors & builders at activation
/// time; transport & file-system variants show up while records are in flight and are routed to
/// the error sink rather than the logging call site.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// The port is outside [1, 65535]; raised when the endpoint is constructed, never per-record
    BadPort {
        port: u16,
        back: Backtrace,
    },
    /// The SD-ID handed to the structured-data encoder violates RFC 5424 section 6.3.2
    BadSdId {
        id: String,
        back: Backtrace,
    },
    /// Failed to fetch the current executable (via std::env)
    NoExecutable {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Couldn't fall back to a local IP address for the HOSTNAME field
    BadIpAddress,
    /// The exception-offload folder is missing and could not be created
    MissingFolder {
        path: std::path::PathBuf,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Ran out of suffixed alternate file names while opening a rolling log file
    ExhaustedLogFileNames {
        path: std::path::PathBuf,
        back: Backtrace,
    },
    /// File-system error on the rolling/offload path
    File {
        path: std::path::PathBuf,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    /// A directory-not-found failure is never retried (spelled out here so the rolling writer
    /// needn't re-derive it from the io::ErrorKind at each call site).
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::File { source, .. } => source
                .downcast_ref::<std::io::Error>()
                .map(|err| err.kind() == std::io::ErrorKind::NotFound)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadPort { port, .. } => {
                write!(f, "Port {} is outside the valid range [1, 65535]", port)
            }
            Error::BadSdId { id, .. } => {
                write!(
                    f,
                    "\"{}\" is not a valid SD-ID (1-32 printable ASCII, excluding '=', SP, ']' and '\"')",
                    id
                )
            }
            Error::NoExecutable { source, .. } => {
                write!(f, "Couldn't fetch the current executable: {}", source)
            }
            Error::NoHostname { source, .. } => {
                write!(f, "Couldn't fetch the hostname: {}", source)
            }
            Error::BadIpAddress => {
                write!(
                    f,
                    "The discovered IP address is not usable as an RFC 5424 HOSTNAME"
                )
            }
            Error::MissingFolder { path, source, .. } => {
                write!(
                    f,
                    "The exception-offload folder {} is missing and couldn't be created: {}",
                    path.display(),
                    source
                )
            }
            Error::ExhaustedLogFileNames { path, .. } => {
                write!(
                    f,
                    "Exhausted all alternate log file names for {}",
                    path.display()
                )
            }
            Error::File { path, source, .. } => {
                write!(f, "File error on {}: {}", path.display(), source)
            }
            Error::Transport { source, .. } => write!(f, "Transport error: {:?}", source),
            _ => write!(f, "Other syslog-relay error"),
        }
    }
}

impl std::fmt::Debug for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadPort { port: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadSdId { id: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadIpAddress => write!(f, "{}", self),
            Error::MissingFolder { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::ExhaustedLogFileNames { path: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::File { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "syslog-relay error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
