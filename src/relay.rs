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

//! The record pipeline: offload, encode, ship.
//!
//! [`SyslogRelay`] is what callers hand their [`LogRecord`]s to. It runs synchronously on the
//! calling thread: offload the exception detail (when one is attached & an offloader is
//! configured), render the wire message, hand it to the transport. Every failure past
//! construction goes to the [`ErrorSink`]-- a failure to ship a log record must never crash the
//! instrumented application, so [`append`](SyslogRelay::append) returns nothing and throws
//! nothing.
//!
//! All fail-fast validation (ports, SD-IDs, offload folders) has already happened by the time a
//! `SyslogRelay` exists, since each of its parts validates in its own constructor.

use crate::{
    error::Error,
    offload::ExceptionOffloader,
    record::LogRecord,
    rfc5424::Rfc5424Encoder,
    transport::Transport,
};

/// Receiver for delivery & offload failures.
///
/// Implementations must not panic; they are invoked on the logging call path.
pub trait ErrorSink: Send + Sync {
    fn on_error(&self, err: &Error);
}

/// The default sink: report through [`tracing`], on the theory that whoever is watching the
/// process's own diagnostics wants to know its log shipping is failing.
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn on_error(&self, err: &Error) {
        tracing::error!(error = %err, "failed to relay log record");
    }
}

/// The assembled pipeline: encoder + transport + optional exception offload + error sink.
pub struct SyslogRelay<T: Transport> {
    encoder: Rfc5424Encoder,
    transport: T,
    offloader: Option<ExceptionOffloader>,
    sink: Box<dyn ErrorSink>,
}

impl<T: Transport> SyslogRelay<T> {
    pub fn new(encoder: Rfc5424Encoder, transport: T) -> SyslogRelay<T> {
        SyslogRelay {
            encoder,
            transport,
            offloader: None,
            sink: Box::new(TracingErrorSink),
        }
    }

    /// Persist exception detail through `offloader` before encoding.
    pub fn with_offloader(mut self, offloader: ExceptionOffloader) -> Self {
        self.offloader = Some(offloader);
        self
    }

    pub fn with_error_sink(mut self, sink: Box<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Ship one record. Fire-and-forget: never returns an error, never panics.
    ///
    /// An offload failure downgrades gracefully-- the record still ships, just without the
    /// detail-file reference.
    pub fn append(&self, mut record: LogRecord) {
        if let Some(offloader) = &self.offloader {
            if let Err(err) = offloader.offload(&mut record) {
                self.sink.on_error(&err);
            }
        }

        let buf = self.encoder.encode(&record);
        if let Err(err) = self.transport.send(&buf) {
            self.sink.on_error(&err);
        }
    }
}
