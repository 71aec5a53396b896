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
//! Ship structured log records to a [`syslog`] collector per RFC [5424], preserving what the
//! wire can't carry.
//!
//! [`syslog`]: https://en.wikipedia.org/wiki/Syslog
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//!
//! # Introduction
//!
//! This crate is the encoding-and-transport tail of a logging pipeline. It is *not* a logging
//! framework: callers arrive with a [`LogRecord`] that is already leveled & keyed, and all this
//! crate does is encode it (priority, UTC timestamp, sanitized header fields, structured data),
//! truncate it to a negotiated byte budget, and deliver it-- over TCP (reliable, ordered, one
//! persistent connection with lazy reconnect) or UDP (best-effort, one datagram per record).
//!
//! Two things make that more interesting than `write()` in a loop:
//!
//! 1. The collector link is assumed unreliable or congested. Delivery failures are reported to a
//!    pluggable [`ErrorSink`] and *never* raised back into the instrumented application; a dead
//!    collector must not take the process down with it.
//!
//! 2. Records carrying exceptions are bigger than the RFC's 2048-octet recommendation wants to
//!    see, and their stack traces are precisely the bytes you don't want truncated. Such records
//!    are intercepted before encoding: the full exception chain is written to a local file (via
//!    the rolling, retry-on-contention [`RollingFileWriter`]) and a generated correlation id
//!    links the trimmed wire message to that file.
//!
//! # Usage
//!
//! ```no_run
//! use syslog_relay::{
//!     record::LogRecord,
//!     relay::SyslogRelay,
//!     rfc5424::Rfc5424Encoder,
//!     severity::Severity,
//!     transport::{Protocol, TcpTransport, TransportEndpoint},
//! };
//!
//! let encoder = Rfc5424Encoder::builder()
//!     .sd_id("APP@12345")
//!     .build()
//!     .unwrap(); // SD-ID is validated here, at configuration time
//!
//! let endpoint = TransportEndpoint::new("logs.example.com", 6514, Protocol::Tcp).unwrap();
//! let relay = SyslogRelay::new(encoder, TcpTransport::new(endpoint));
//!
//! // fire-and-forget; a dead collector is the sink's problem, not yours
//! relay.append(
//!     LogRecord::builder(Severity::Warn, "cache miss rate above threshold")
//!         .property("CacheName", "sessions")
//!         .build(),
//! );
//! ```
//!
//! Produces wire lines like:
//!
//! ```text
//! <132>1 2026-08-06T17:03:21.114Z app-host-1 myapp 4242 - [APP@12345 CacheName="sessions" EventSeverity="WARN"] cache miss rate above threshold
//! ```
//!
//! [`LogRecord`]: crate::record::LogRecord
//! [`ErrorSink`]: crate::relay::ErrorSink
//! [`RollingFileWriter`]: crate::rolling::RollingFileWriter

pub mod context;
pub mod error;
pub mod offload;
pub mod record;
pub mod relay;
pub mod rfc5424;
pub mod rolling;
pub mod sanitize;
pub mod sd;
pub mod severity;
pub mod transport;
