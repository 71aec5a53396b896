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

//! RFC [5424]-compliant syslog message assembly.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//!
//! [`Rfc5424Encoder`] turns a [`LogRecord`] into one wire-ready line:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG\n
//! ```
//!
//! Each header field is a closed [`Field`] variant dispatched through a single `match`-- there is
//! no open-ended converter registry; adding a field means adding a variant, and the compiler
//! walks every dispatch site for you.
//!
//! Encoding is total: empty or unmappable fields render as the NILVALUE `-`, never an error.

use crate::{
    context::SourceContext,
    record::LogRecord,
    sanitize::{sanitize, AsciiPolicy},
    sd::StructuredData,
    severity::{priority, Facility},
};

/// RFC 5424 section 6.1 recommends supporting messages of at least 2048 octets.
pub const SYSLOG_MAX_MESSAGE_LENGTH: usize = 2048;

const HOSTNAME_MAX: usize = 255;
const APP_NAME_MAX: usize = 48;
const PROC_ID_MAX: usize = 48;
const MSG_ID_MAX: usize = 32;

const NILVALUE: &str = "-";

/// The fields of an RFC 5424 message, in wire order.
///
/// `Header` covers `<PRI>1`-- the version digit is glued to the priority, with no separating
/// space, so the two render as one token.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Field {
    Header,
    Timestamp,
    Hostname,
    AppName,
    ProcId,
    MsgId,
    StructuredData,
    Message,
}

const WIRE_ORDER: [Field; 8] = [
    Field::Header,
    Field::Timestamp,
    Field::Hostname,
    Field::AppName,
    Field::ProcId,
    Field::MsgId,
    Field::StructuredData,
    Field::Message,
];

/// An encoder producing RFC [5424]-conformant syslog messages from [`LogRecord`]s.
///
/// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
pub struct Rfc5424Encoder {
    facility: Facility,
    context: SourceContext,
    structured_data: StructuredData,
    max_message_len: usize,
    octet_framing: bool,
}

pub struct Rfc5424EncoderBuilder {
    facility: Facility,
    context: SourceContext,
    sd_id: String,
    max_message_len: usize,
    octet_framing: bool,
}

impl Rfc5424EncoderBuilder {
    pub fn facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }
    pub fn context(mut self, context: SourceContext) -> Self {
        self.context = context;
        self
    }
    /// The SD-ID for the emitted SD-ELEMENT, e.g. "TEST@12345". Required; validated at
    /// [`build`](Rfc5424EncoderBuilder::build).
    pub fn sd_id(mut self, sd_id: impl Into<String>) -> Self {
        self.sd_id = sd_id.into();
        self
    }
    /// Byte budget for the assembled message. Defaults to [`SYSLOG_MAX_MESSAGE_LENGTH`].
    pub fn max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max;
        self
    }
    /// Prepend the decimal byte count of the message (RFC [6587] octet counting), for stream
    /// transports that can't rely on the trailing newline once truncation is in play.
    ///
    /// [6587]: https://datatracker.ietf.org/doc/html/rfc6587
    pub fn octet_framing(mut self, framing: bool) -> Self {
        self.octet_framing = framing;
        self
    }
    /// Validate & build. An invalid SD-ID fails here, at configuration time.
    pub fn build(self) -> crate::error::Result<Rfc5424Encoder> {
        Ok(Rfc5424Encoder {
            facility: self.facility,
            context: self.context,
            structured_data: StructuredData::new(self.sd_id)?,
            max_message_len: self.max_message_len,
            octet_framing: self.octet_framing,
        })
    }
}

impl Rfc5424Encoder {
    pub fn builder() -> Rfc5424EncoderBuilder {
        Rfc5424EncoderBuilder {
            facility: Facility::default(),
            context: SourceContext::default(),
            sd_id: String::new(),
            max_message_len: SYSLOG_MAX_MESSAGE_LENGTH,
            octet_framing: false,
        }
    }

    /// Encode `record` to wire bytes.
    ///
    /// Idempotent for a given record & encoder: the timestamp comes off the record, so encoding
    /// the same record twice yields byte-identical output.
    pub fn encode(&self, record: &LogRecord) -> Vec<u8> {
        let mut msg = String::with_capacity(256);
        for (i, field) in WIRE_ORDER.iter().enumerate() {
            if i > 0 {
                msg.push(' ');
            }
            self.render_field(*field, record, &mut msg);
        }
        msg.push('\n');

        truncate_to_bytes(&mut msg, self.max_message_len);

        use bytes::BufMut;
        let mut buf = Vec::with_capacity(msg.len() + 8);
        if self.octet_framing {
            buf.put_slice(format!("{} ", msg.len()).as_bytes());
        }
        buf.put_slice(msg.as_bytes());
        buf
    }

    fn render_field(&self, field: Field, record: &LogRecord, out: &mut String) {
        match field {
            Field::Header => {
                out.push('<');
                out.push_str(&priority(record.severity, self.facility).to_string());
                out.push_str(">1");
            }
            Field::Timestamp => {
                out.push_str(
                    &record
                        .timestamp
                        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                        .to_string(),
                );
            }
            Field::Hostname => {
                push_sanitized(out, self.context.hostname(), HOSTNAME_MAX);
            }
            Field::AppName => {
                push_sanitized(out, self.context.app_name(), APP_NAME_MAX);
            }
            Field::ProcId => {
                push_sanitized(out, self.context.proc_id(), PROC_ID_MAX);
            }
            Field::MsgId => {
                push_sanitized(out, &self.resolve_msg_id(record), MSG_ID_MAX);
            }
            Field::StructuredData => {
                out.push_str(&self.structured_data.render(record));
            }
            Field::Message => {
                out.push_str(&record.message);
            }
        }
    }

    /// MSGID resolution order: the explicit `MessageId` property, else the last
    /// whitespace-delimited segment of the activity (nested-diagnostic-context) string, else the
    /// NILVALUE.
    fn resolve_msg_id(&self, record: &LogRecord) -> String {
        if let Some(id) = record.property("MessageId") {
            if !id.is_empty() {
                return id.to_string();
            }
        }
        if let Some(activity) = &record.activity {
            if let Some(last) = activity.split_whitespace().last() {
                return last.to_string();
            }
        }
        NILVALUE.to_string()
    }
}

fn push_sanitized(out: &mut String, value: &str, max: usize) {
    let clean = sanitize(value, max, &[], AsciiPolicy::Visible);
    if clean.is_empty() {
        out.push_str(NILVALUE);
    } else {
        out.push_str(&clean);
    }
}

/// Truncate `s` to at most `max` UTF-8 bytes, backing off rather than splitting a multi-byte
/// sequence.
fn truncate_to_bytes(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::record::ExceptionInfo;
    use crate::severity::Severity;

    use chrono::prelude::*;

    fn test_encoder() -> Rfc5424Encoder {
        Rfc5424Encoder::builder()
            .context(
                SourceContext::default()
                    .with_hostname("bree.local")
                    .with_app_name("prototyping")
                    .with_proc_id("123"),
            )
            .sd_id("TEST@12345")
            .build()
            .unwrap()
    }

    fn test_record(severity: Severity, message: &str) -> LogRecord {
        LogRecord::builder(severity, message)
            .timestamp(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn golden_line() {
        let enc = test_encoder();
        let rsp = enc.encode(&test_record(Severity::Info, "Hello, world!"));
        assert_eq!(
            std::str::from_utf8(&rsp).unwrap(),
            "<134>1 1970-01-01T00:00:00.000Z bree.local prototyping 123 - [TEST@12345 EventSeverity=\"INFO\"] Hello, world!\n"
        );
    }

    #[test]
    fn debug_priority_prefix() {
        let enc = test_encoder();
        let record = LogRecord::builder(Severity::Debug, "test message")
            .exception(ExceptionInfo::new(
                "System.ArgumentNullException",
                "Value cannot be null.",
            ))
            .build();
        let out = enc.encode(&record);
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("<135>1 "));
        assert!(text.contains(
            "[TEST@12345 EventSeverity=\"DEBUG\" ExceptionType=\"System.ArgumentNullException\" ExceptionMessage=\"Value cannot be null.\"]"
        ));
        assert!(text.ends_with("test message\n"));
    }

    #[test]
    fn encoding_is_idempotent() {
        let enc = test_encoder();
        let record = test_record(Severity::Warn, "same bytes, twice");
        assert_eq!(enc.encode(&record), enc.encode(&record));
    }

    #[test]
    fn msg_id_resolution() {
        let enc = test_encoder();

        // explicit property wins
        let record = LogRecord::builder(Severity::Info, "m")
            .timestamp(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())
            .property("MessageId", "REQ-42")
            .activity("outer inner leaf")
            .build();
        let text = String::from_utf8(enc.encode(&record)).unwrap();
        assert!(text.contains(" 123 REQ-42 ["));

        // else the last whitespace-delimited segment of the activity string
        let record = LogRecord::builder(Severity::Info, "m")
            .timestamp(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())
            .activity("outer inner leaf")
            .build();
        let text = String::from_utf8(enc.encode(&record)).unwrap();
        assert!(text.contains(" 123 leaf ["));

        // else NILVALUE
        let record = test_record(Severity::Info, "m");
        let text = String::from_utf8(enc.encode(&record)).unwrap();
        assert!(text.contains(" 123 - ["));
    }

    #[test]
    fn header_fields_are_sanitized() {
        let enc = Rfc5424Encoder::builder()
            .context(
                SourceContext::default()
                    .with_hostname("bree local\x01")
                    .with_app_name("")
                    .with_proc_id("123"),
            )
            .sd_id("TEST@12345")
            .build()
            .unwrap();
        let text = String::from_utf8(enc.encode(&test_record(Severity::Info, "m"))).unwrap();
        // space & control stripped from the hostname; empty app name becomes NILVALUE
        assert!(text.contains(" breelocal - 123 "));
    }

    #[test]
    fn truncation_is_byte_exact() {
        let enc = Rfc5424Encoder::builder()
            .context(
                SourceContext::default()
                    .with_hostname("bree.local")
                    .with_app_name("prototyping")
                    .with_proc_id("123"),
            )
            .sd_id("TEST@12345")
            .max_message_len(2048)
            .build()
            .unwrap();
        let record = test_record(Severity::Info, &"x".repeat(5000));
        let out = enc.encode(&record);
        assert_eq!(out.len(), 2048);
        assert!(std::str::from_utf8(&out).is_ok());
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let enc = test_encoder();
        // every char below is 3 bytes; whatever the budget, the cut must not split one
        let record = test_record(Severity::Info, &"世".repeat(2000));
        let out = enc
            .encode(&record)
            .len();
        assert!(out <= 2048);
        let enc = Rfc5424Encoder::builder()
            .context(
                SourceContext::default()
                    .with_hostname("bree.local")
                    .with_app_name("prototyping")
                    .with_proc_id("123"),
            )
            .sd_id("TEST@12345")
            .max_message_len(100)
            .build()
            .unwrap();
        let out = enc.encode(&record);
        assert!(out.len() <= 100);
        assert!(std::str::from_utf8(&out).is_ok());
    }

    #[test]
    fn octet_framing_prefixes_length() {
        let enc = Rfc5424Encoder::builder()
            .context(
                SourceContext::default()
                    .with_hostname("bree.local")
                    .with_app_name("prototyping")
                    .with_proc_id("123"),
            )
            .sd_id("TEST@12345")
            .octet_framing(true)
            .build()
            .unwrap();
        let out = enc.encode(&test_record(Severity::Info, "Hello, world!"));
        let text = std::str::from_utf8(&out).unwrap();
        let (prefix, rest) = text.split_once(' ').unwrap();
        let declared: usize = prefix.parse().unwrap();
        assert_eq!(declared, rest.len());
        assert!(rest.starts_with("<134>1 "));
    }

    #[test]
    fn bad_sd_id_fails_at_build() {
        assert!(Rfc5424Encoder::builder().sd_id("").build().is_err());
        assert!(Rfc5424Encoder::builder().sd_id("no spaces").build().is_err());
    }
}
