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

//! Process-wide source identity, captured once.
//!
//! The HOSTNAME, APP-NAME & PROCID header fields (and the rolling writer's path tokens) describe
//! the *emitting process*, not any one record. [`SourceContext`] computes them once at
//! configuration time and is passed around as an immutable value thereafter-- no hidden global
//! mutable state, and tests can inject whatever identity they like.

use crate::error::Error;

use backtrace::Backtrace;

type StdResult<T, E> = std::result::Result<T, E>;

/// The emitting process's identity: hostname, application name, process id & process name.
///
/// `Default` resolves everything from the environment; the builder-style `with_*` methods
/// override individual fields. Values here are *raw*-- the encoder sanitizes them per-field when
/// assembling a message.
#[derive(Clone, Debug)]
pub struct SourceContext {
    hostname: String,
    app_name: String,
    proc_id: String,
}

impl std::default::Default for SourceContext {
    /// Resolve the process identity from the environment.
    ///
    /// The order of preference for the HOSTNAME field per RFC [5424] is FQDN, then static IP
    /// address, then hostname, then dynamic IP, then the NILVALUE. This implementation first
    /// tries [gethostname()], then uses the local IP address, then gives up & uses "-".
    ///
    /// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
    /// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
    fn default() -> Self {
        SourceContext {
            hostname: resolve_hostname(),
            app_name: resolve_app_name(),
            proc_id: std::process::id().to_string(),
        }
    }
}

impl SourceContext {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
    /// The application name; also serves as the process name for path templates.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
    pub fn proc_id(&self) -> &str {
        &self.proc_id
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }
    pub fn with_proc_id(mut self, proc_id: impl Into<String>) -> Self {
        self.proc_id = proc_id.into();
        self
    }
}

fn resolve_hostname() -> String {
    // `hostname::get()` returns an `Result<OsString,_>`, which is really kind of a hassle to work
    // with...
    hostname::get()
        .map_err(|err| Error::NoHostname {
            source: Box::new(err),
            back: Backtrace::new(),
        })
        .map(|hn| hn.to_string_lossy().into_owned())
        // vvv will return the Ok(String), or fall back to the local IP address :=>
        // StdResult<String, Error>
        .or_else(|_err| {
            let ip: StdResult<std::net::IpAddr, Error> =
                local_ip_address::local_ip().map_err(|_| Error::BadIpAddress);
            ip.map(|ip| ip.to_string())
        })
        .or_else::<Error, _>(|_| Ok("-".to_string()))
        .unwrap()
}

fn resolve_app_name() -> String {
    std::env::current_exe() // :=> StdResult<PathBuf, std::io::Error>
        .map_err(|err| Error::NoExecutable {
            source: Box::new(err),
            back: Backtrace::new(),
        })
        .map(|pbuf| match pbuf.file_name() {
            Some(os_str) => os_str.to_string_lossy().into_owned(),
            None => "-".to_string(),
        })
        .unwrap_or_else(|_| "-".to_string())
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn default_is_populated() {
        // At least _exercise_ `Default`; the proc id is the one field with a knowable shape.
        let ctx = SourceContext::default();
        assert!(!ctx.proc_id().is_empty());
        assert!(ctx.proc_id().bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn overrides() {
        let ctx = SourceContext::default()
            .with_hostname("bree.local")
            .with_app_name("prototyping")
            .with_proc_id("123");
        assert_eq!(ctx.hostname(), "bree.local");
        assert_eq!(ctx.app_name(), "prototyping");
        assert_eq!(ctx.proc_id(), "123");
    }
}
