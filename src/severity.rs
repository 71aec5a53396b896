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

//! syslog facility & record severity definitions.
//!
//! [`Facility`] replicates the names used in `<syslog.h>`, identical in both RFC [3164] & [5424].
//! [`Severity`] is the ordering callers hand us on each record; [`priority`] folds the two into
//! the PRI header value.
//!
//! [3164]: https://datatracker.ietf.org/doc/html/rfc3164
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424

type StdResult<T, E> = std::result::Result<T, E>;

/// Both RFCs [5424] & [3164] define twenty-four "facilities" for messages. The enumeration values
/// duplicate the constants defined in `<syslog.h>`, albeit multiplied by 8 for convenience in
/// forming syslog message headers (which again mirrors the `#define`s in `<syslog.h>`).
///
/// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
/// [3164]: https://datatracker.ietf.org/doc/html/rfc3164
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Facility {
    /// kernel messages
    LOG_KERN = 0 << 3,
    /// random user-level messages
    LOG_USER = 1 << 3,
    /// mail system
    LOG_MAIL = 2 << 3,
    /// system daemons
    LOG_DAEMON = 3 << 3,
    /// security/authorization messages
    LOG_AUTH = 4 << 3,
    /// messages generated internally by syslogd
    LOG_SYSLOG = 5 << 3,
    /// line printer subsystem
    LOG_LPR = 6 << 3,
    /// network news subsystem
    LOG_NEWS = 7 << 3,
    /// UUCP subsystem
    LOG_UUCP = 8 << 3,
    /// clock daemon
    LOG_CRON = 9 << 3,
    /// security/authorization messages (private)
    LOG_AUTHPRIV = 10 << 3,
    /// ftp daemon
    LOG_FTP = 11 << 3,
    /// NTP subsystem
    LOG_NTP = 12 << 3,
    /// log audit
    LOG_AUDIT = 13 << 3,
    /// log alert
    LOG_ALERT = 14 << 3,
    /// clock daemon
    LOG_CLOCK = 15 << 3,
    /// reserved for local use
    LOG_LOCAL0 = 16 << 3,
    /// reserved for local use
    LOG_LOCAL1 = 17 << 3,
    /// reserved for local use
    LOG_LOCAL2 = 18 << 3,
    /// reserved for local use
    LOG_LOCAL3 = 19 << 3,
    /// reserved for local use
    LOG_LOCAL4 = 20 << 3,
    /// reserved for local use
    LOG_LOCAL5 = 21 << 3,
    /// reserved for local use
    LOG_LOCAL6 = 22 << 3,
    /// reserved for local use
    LOG_LOCAL7 = 23 << 3,
}

impl std::default::Default for Facility {
    /// The default facility is `LOG_LOCAL0` (code 16), the conventional facility for
    /// application-defined collectors.
    fn default() -> Self {
        Facility::LOG_LOCAL0
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Facility::LOG_KERN => "LOG_KERN",
                Facility::LOG_USER => "LOG_USER",
                Facility::LOG_MAIL => "LOG_MAIL",
                Facility::LOG_DAEMON => "LOG_DAEMON",
                Facility::LOG_AUTH => "LOG_AUTH",
                Facility::LOG_SYSLOG => "LOG_SYSLOG",
                Facility::LOG_LPR => "LOG_LPR",
                Facility::LOG_NEWS => "LOG_NEWS",
                Facility::LOG_UUCP => "LOG_UUCP",
                Facility::LOG_CRON => "LOG_CRON",
                Facility::LOG_AUTHPRIV => "LOG_AUTHPRIV",
                Facility::LOG_FTP => "LOG_FTP",
                Facility::LOG_NTP => "LOG_NTP",
                Facility::LOG_AUDIT => "LOG_AUDIT",
                Facility::LOG_ALERT => "LOG_ALERT",
                Facility::LOG_CLOCK => "LOG_CLOCK",
                Facility::LOG_LOCAL0 => "LOG_LOCAL0",
                Facility::LOG_LOCAL1 => "LOG_LOCAL1",
                Facility::LOG_LOCAL2 => "LOG_LOCAL2",
                Facility::LOG_LOCAL3 => "LOG_LOCAL3",
                Facility::LOG_LOCAL4 => "LOG_LOCAL4",
                Facility::LOG_LOCAL5 => "LOG_LOCAL5",
                Facility::LOG_LOCAL6 => "LOG_LOCAL6",
                Facility::LOG_LOCAL7 => "LOG_LOCAL7",
            }
        )
    }
}

/// Record severity, ordered from least to most urgent.
///
/// This is the ordering callers use when leveling their records; it is *not* the syslog severity
/// code (which runs the other way-- see [`Severity::code`]). Deriving `Ord` here gives us the
/// record-side ordering `Debug < Info < Warn < Error < Fatal < Emergency` for free.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// debug/verbose messages
    Debug,
    /// informational messages
    Info,
    /// warning conditions
    Warn,
    /// error conditions
    Error,
    /// critical conditions; the application cannot continue
    Fatal,
    /// system is unusable
    Emergency,
}

impl Severity {
    /// Map to the syslog severity code carried in the PRI header.
    ///
    /// The mapping is total: anything not explicitly listed (i.e. anything less urgent than
    /// `Info`) floors to 7, the most verbose code.
    pub fn code(&self) -> u8 {
        match self {
            Severity::Emergency => 0,
            Severity::Fatal => 2,
            Severity::Error => 3,
            Severity::Warn => 4,
            Severity::Info => 6,
            _ => 7,
        }
    }

    /// The display name emitted in the `EventSeverity` structured-data pair.
    pub fn display_name(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.display_name())
    }
}

/// Compute the PRI value `facility * 8 + severity-code`.
///
/// Total function: every `(severity, facility)` pair maps to an integer. The `Facility`
/// discriminants are pre-multiplied by 8, so this is a bitwise or, exactly as `<syslog.h>`
/// composes `LOG_MAKEPRI`.
pub fn priority(severity: Severity, facility: Facility) -> u8 {
    facility as u8 | severity.code()
}

#[cfg(test)]
mod test {

    use super::*;

    /// Test basic PRI formatting
    #[test]
    fn test_pri() {
        // severity=Error, facility=16 (default) => 16*8+3 = 131
        assert_eq!(131, priority(Severity::Error, Facility::default()));
        // the Debug case from the collector's acceptance fixture
        assert_eq!(135, priority(Severity::Debug, Facility::LOG_LOCAL0));
        assert_eq!(14, priority(Severity::Info, Facility::LOG_USER));
        assert_eq!(format!("{}", Facility::LOG_FTP), "LOG_FTP".to_string());
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert!(Severity::Fatal < Severity::Emergency);
    }

    /// The severity code is monotonic non-increasing as urgency increases, and lands in the
    /// fixed set {0, 2, 3, 4, 6, 7}.
    #[test]
    fn test_code_monotonic_and_total() {
        let ordered = [
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
            Severity::Emergency,
        ];
        let codes: Vec<u8> = ordered.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec![7, 6, 4, 3, 2, 0]);
        for w in codes.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }
}
