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

//! RFC [5424] STRUCTURED-DATA rendering.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//!
//! One SD-ELEMENT per message: `[SD-ID key1="val1" key2="val2" ...]`. The SD-ID is fixed at
//! configuration time (and validated then-- a bad SD-ID is a configuration error, not a
//! per-record one); the pairs come from the record's properties in insertion order, followed by a
//! synthesized `EventSeverity` pair and, when the record carries an exception, the exception
//! pairs. Keys are sanitized per section 6.3.3; values are escaped, not sanitized, since
//! SD-PARAM-VALUE is free UTF-8.

use crate::{
    error::{Error, Result},
    record::{LogRecord, PROP_EXCEPTION_LOG, RESERVED_PREFIX},
    sanitize::{sanitize, AsciiPolicy},
};

use backtrace::Backtrace;

/// SD-NAME = 1*32PRINTUSASCII; except '=', SP, ']', %d34 (")
const SD_NAME_FORBIDDEN: [u8; 3] = [0x5D, 0x22, 0x3D];

const SD_NAME_MAX: usize = 32;

/// A validated SD-ID plus the rendering rules for the single SD-ELEMENT this crate emits.
#[derive(Clone, Debug)]
pub struct StructuredData {
    sd_id: String,
}

impl StructuredData {
    /// Validate & wrap an SD-ID, e.g. "TEST@12345".
    ///
    /// Fail-fast: an empty id, one longer than 32 bytes, or one containing a forbidden octet is
    /// rejected here, at configuration time.
    pub fn new(sd_id: impl Into<String>) -> Result<StructuredData> {
        let sd_id = sd_id.into();
        let clean = sanitize(&sd_id, SD_NAME_MAX, &SD_NAME_FORBIDDEN, AsciiPolicy::Visible);
        if sd_id.is_empty() || clean != sd_id {
            return Err(Error::BadSdId {
                id: sd_id,
                back: Backtrace::new(),
            });
        }
        Ok(StructuredData { sd_id })
    }

    pub fn sd_id(&self) -> &str {
        &self.sd_id
    }

    /// Render the SD-ELEMENT for `record`.
    ///
    /// Emission order: caller properties (insertion order, reserved-prefix keys skipped), then
    /// `EventSeverity`, then the exception pairs. Pairs with empty values are omitted entirely.
    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(64);
        out.push('[');
        out.push_str(&self.sd_id);

        for (key, value) in record.properties() {
            // ignore the relay's internal bookkeeping; EventLog picks up the offload path below
            if key.starts_with(RESERVED_PREFIX) {
                continue;
            }
            push_pair(&mut out, key, value);
        }

        push_pair(&mut out, "EventSeverity", record.severity.display_name());
        self.render_exception(&mut out, record);

        out.push(']');
        out
    }

    fn render_exception(&self, out: &mut String, record: &LogRecord) {
        if let Some(ex) = &record.exception {
            push_pair(out, "ExceptionSource", ex.source.as_deref().unwrap_or(""));
            push_pair(out, "ExceptionType", &ex.type_name);
            push_pair(out, "ExceptionMessage", &ex.message);
            push_pair(out, "EventHelp", ex.help_link.as_deref().unwrap_or(""));
            // the offloader stashed the detail-file path under the reserved prefix
            push_pair(
                out,
                "EventLog",
                record.property(PROP_EXCEPTION_LOG).unwrap_or(""),
            );
        } else if let Some(text) = &record.exception_text {
            push_pair(out, "ExceptionMessage", text);
        }
    }
}

fn push_pair(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push(' ');
    out.push_str(&sanitize(
        name,
        SD_NAME_MAX,
        &SD_NAME_FORBIDDEN,
        AsciiPolicy::Visible,
    ));
    out.push_str("=\"");
    out.push_str(&escape_param_value(value));
    out.push('"');
}

/// Escape an SD-PARAM-VALUE per RFC 5424 section 6.3.3: prepend `\` before `"`, `\` and `]`.
///
/// Char-wise, not byte-wise-- the value may be arbitrary UTF-8 and multi-byte sequences must pass
/// through untouched.
fn escape_param_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '"' || ch == '\\' || ch == ']' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
