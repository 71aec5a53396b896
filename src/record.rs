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

//! Log records as handed to the pipeline.
//!
//! A [`LogRecord`] arrives already leveled & keyed; this crate only encodes and ships it. The one
//! exception (pun intended) is the offload step, which attaches its correlation id and detail-file
//! path under the [`RESERVED_PREFIX`] before encoding begins. Reserved-prefix properties are
//! transport bookkeeping: they never appear in the emitted structured data.

use crate::severity::Severity;

use chrono::prelude::*;

/// Property keys with this prefix are internal to the relay and excluded from structured-data
/// emission.
pub const RESERVED_PREFIX: &str = "relay:";

/// Property key the offloader uses for the correlation id.
pub const PROP_EXCEPTION_ID: &str = "relay:exception-id";

/// Property key the offloader uses for the detail-file path.
pub const PROP_EXCEPTION_LOG: &str = "relay:exception-log";

/// Exception detail attached to a record: one link of a cause chain.
#[derive(Clone, Debug, Default)]
pub struct ExceptionInfo {
    /// Fully-qualified type name, e.g. "System.ArgumentNullException"
    pub type_name: String,
    pub message: String,
    /// Originating component, if the caller knows it
    pub source: Option<String>,
    /// Method or call site that raised, if known
    pub target_site: Option<String>,
    /// Help/documentation link, if any
    pub help_link: Option<String>,
    pub stack_trace: Option<String>,
    /// The next inner cause, if any
    pub inner: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> ExceptionInfo {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            ..ExceptionInfo::default()
        }
    }

    /// Render the full chain for the offload file: one labeled line per field, inner causes
    /// recursively appended behind a marker line.
    pub fn detail(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        let opt = |o: &Option<String>| o.clone().unwrap_or_default();
        out.push_str(&format!("Source : {}\n", opt(&self.source)));
        out.push_str(&format!("Type : {}\n", self.type_name));
        out.push_str(&format!("Message : {}\n", self.message));
        out.push_str(&format!("Target Site : {}\n", opt(&self.target_site)));
        out.push_str(&format!("Help Link : {}\n", opt(&self.help_link)));
        out.push_str(&format!("Stack Trace : {}\n", opt(&self.stack_trace)));
        if let Some(inner) = &self.inner {
            out.push('\n');
            out.push_str("---INNER EXCEPTION DATA---\n");
            inner.render_into(out);
        }
    }
}

/// One structured log record, immutable once handed to the pipeline (the offload step being the
/// sole, internal, pre-encoding mutation).
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Source/logger name
    pub logger: String,
    pub message: String,
    /// Caller-supplied properties, emitted into structured data in insertion order
    properties: Vec<(String, String)>,
    pub exception: Option<ExceptionInfo>,
    /// A pre-rendered exception string, for callers that have already flattened their error
    pub exception_text: Option<String>,
    /// Nested-diagnostic-context string; its last whitespace-delimited segment is the MSGID
    /// fallback
    pub activity: Option<String>,
}

impl LogRecord {
    pub fn builder(severity: Severity, message: impl Into<String>) -> LogRecordBuilder {
        LogRecordBuilder {
            imp: LogRecord {
                severity,
                timestamp: Utc::now(),
                logger: String::new(),
                message: message.into(),
                properties: Vec::new(),
                exception: None,
                exception_text: None,
                activity: None,
            },
        }
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Look up a property by exact key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing any prior value under the same key (insertion position is kept
    /// on replacement).
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }
}

pub struct LogRecordBuilder {
    imp: LogRecord,
}

impl LogRecordBuilder {
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.imp.timestamp = timestamp;
        self
    }
    pub fn logger(mut self, logger: impl Into<String>) -> Self {
        self.imp.logger = logger.into();
        self
    }
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.imp.properties.push((key.into(), value.into()));
        self
    }
    pub fn exception(mut self, exception: ExceptionInfo) -> Self {
        self.imp.exception = Some(exception);
        self
    }
    pub fn exception_text(mut self, text: impl Into<String>) -> Self {
        self.imp.exception_text = Some(text.into());
        self
    }
    pub fn activity(mut self, activity: impl Into<String>) -> Self {
        self.imp.activity = Some(activity.into());
        self
    }
    pub fn build(self) -> LogRecord {
        self.imp
    }
}
