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

//! Printable-ASCII field sanitization.
//!
//! RFC [5424] header fields (HOSTNAME, APP-NAME, PROCID, MSGID) and SD-NAMEs are restricted to
//! PRINTUSASCII, in some positions minus a handful of forbidden octets. [`sanitize`] is the one
//! total function every field passes through on its way onto the wire: it never errors, and
//! forbidden-only input just comes back empty.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424

/// Lower bound of the retained byte range.
///
/// The RFC's PRINTUSASCII is %d33-126; SP (%d32) is legal in a free-form MSG but never inside a
/// header field or SD-NAME. Call sites in this crate use [`AsciiPolicy::Visible`]; the
/// space-preserving variant exists for callers sanitizing free-text values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AsciiPolicy {
    /// Retain %d33-126 (PRINTUSASCII-- no space)
    Visible,
    /// Retain %d32-126 (printable including space)
    Printable,
}

impl AsciiPolicy {
    fn lower_bound(&self) -> u8 {
        match self {
            AsciiPolicy::Visible => 33,
            AsciiPolicy::Printable => 32,
        }
    }
}

impl std::default::Default for AsciiPolicy {
    fn default() -> Self {
        AsciiPolicy::Visible
    }
}

/// Strip `input` down to printable ASCII, drop `forbidden` octets, and truncate to `max_len`
/// *sanitized* bytes.
///
/// Operates byte-wise: multi-byte UTF-8 sequences are dropped wholesale (each of their bytes is
/// above 126). Truncation happens after filtering, so a string of 100 control characters followed
/// by "ok" sanitizes to "ok" under any bound >= 2.
pub fn sanitize(input: &str, max_len: usize, forbidden: &[u8], policy: AsciiPolicy) -> String {
    let lower = policy.lower_bound();
    let mut out = String::with_capacity(std::cmp::min(input.len(), max_len));
    for b in input.bytes() {
        if b < lower || b > 126 || forbidden.contains(&b) {
            continue;
        }
        if out.len() == max_len {
            break;
        }
        out.push(b as char);
    }
    out
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn passthrough() {
        assert_eq!(sanitize("MessageId", 32, &[], AsciiPolicy::Visible), "MessageId");
    }

    #[test]
    fn strips_controls_and_high_bytes() {
        assert_eq!(
            sanitize("ab\x00c\x7fd\ne", 32, &[], AsciiPolicy::Visible),
            "abcde"
        );
        // multi-byte sequences drop entirely
        assert_eq!(sanitize("héllo", 32, &[], AsciiPolicy::Visible), "hllo");
    }

    #[test]
    fn forbidden_octets() {
        // SD-NAME forbidden set: ']', '"', '='
        assert_eq!(
            sanitize("a=b\"c]d", 32, &[b']', b'"', b'='], AsciiPolicy::Visible),
            "abcd"
        );
    }

    #[test]
    fn truncates_after_filtering() {
        // 6 sanitized bytes survive; the bound applies to those, not the raw input
        assert_eq!(
            sanitize("\x01\x02\x03abcdef", 4, &[], AsciiPolicy::Visible),
            "abcd"
        );
    }

    #[test]
    fn policy_lower_bounds() {
        assert_eq!(sanitize("a b", 32, &[], AsciiPolicy::Visible), "ab");
        assert_eq!(sanitize("a b", 32, &[], AsciiPolicy::Printable), "a b");
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(sanitize("", 32, &[], AsciiPolicy::Visible), "");
        assert_eq!(sanitize("\x01\x02", 32, &[], AsciiPolicy::Visible), "");
        assert_eq!(sanitize("abc", 0, &[], AsciiPolicy::Visible), "");
    }

    /// For all strings s and bounds n: len(sanitize(s, n, {})) <= n and every byte lands in
    /// [32, 126].
    #[test]
    fn bound_and_range_property() {
        let inputs = [
            "plain",
            "with spaces and\ttabs",
            "ünïcödé 世界",
            "\x00\x01\x02\x03 ok \x7f",
            "0123456789012345678901234567890123456789",
        ];
        for input in inputs {
            for n in [0usize, 1, 5, 32] {
                let out = sanitize(input, n, &[], AsciiPolicy::Printable);
                assert!(out.len() <= n);
                assert!(out.bytes().all(|b| (32..=126).contains(&b)));
            }
        }
    }
}
