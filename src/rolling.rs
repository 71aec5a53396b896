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

//! Rolling, template-addressed file output.
//!
//! [`RollingFileWriter`] resolves its destination from a path template on every write. Recognized
//! tokens:
//!
//! | token | substitution |
//! |---|---|
//! | `{AppName}` | application name from the [`SourceContext`] |
//! | `{UtcTime}` / `{UtcTime:<strftime>}` | UTC now (default format `%Y-%m-%d`) |
//! | `{LocalTime}` / `{LocalTime:<strftime>}` | local now (default format `%Y-%m-%d`) |
//! | `{MachineName}` | hostname |
//! | `{ProcessId}` | process id |
//! | `{ProcessName}` | process name |
//! | `{BaseDir}` | the configured base directory |
//!
//! Unrecognized tokens pass through literally. Embedding a time token is what produces
//! time-bucketed rotation: when the resolved path changes, the old handle is flushed & closed and
//! a new one opened in append mode.
//!
//! Contention on open is retried against numerically suffixed alternates (`name-1.ext`,
//! `name-2.ext`, ...) up to five attempts in all; a missing directory is not retried-- that's a
//! deployment problem, not a transient one.

use crate::{
    context::SourceContext,
    error::{Error, Result},
};

use backtrace::Backtrace;
use chrono::prelude::*;

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

const MAX_STREAM_RETRIES: u32 = 5;

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d";

struct Inner {
    current_path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

/// Wraps and manages a file handle to allow rolling updates to a text file from multiple threads.
///
/// All state transitions happen under one internal lock; the writer is safe to share by
/// reference with no external synchronization.
pub struct RollingFileWriter {
    template: String,
    context: SourceContext,
    base_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl RollingFileWriter {
    /// Create a writer over `template`. No file is opened until the first write.
    pub fn new(template: impl Into<String>, context: SourceContext) -> RollingFileWriter {
        RollingFileWriter {
            template: template.into(),
            context,
            base_dir: PathBuf::from("."),
            inner: Mutex::new(Inner {
                current_path: None,
                writer: None,
            }),
        }
    }

    /// Directory substituted for the `{BaseDir}` token. Defaults to ".".
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Resolve the template against the current time & source context.
    pub fn resolve_path(&self) -> PathBuf {
        self.resolve_path_at(Utc::now(), Local::now())
    }

    fn resolve_path_at(&self, utc: DateTime<Utc>, local: DateTime<Local>) -> PathBuf {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let token = &after[..close];
                    let (name, format) = match token.split_once(':') {
                        Some((name, format)) => (name, Some(format)),
                        None => (token, None),
                    };
                    match self.substitute(name, format, utc, local) {
                        Some(value) => out.push_str(&value),
                        // unrecognized tokens pass through literally
                        None => {
                            out.push('{');
                            out.push_str(token);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                // unterminated brace: literal
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        PathBuf::from(out)
    }

    fn substitute(
        &self,
        name: &str,
        format: Option<&str>,
        utc: DateTime<Utc>,
        local: DateTime<Local>,
    ) -> Option<String> {
        if name.eq_ignore_ascii_case("AppName") {
            Some(self.context.app_name().to_string())
        } else if name.eq_ignore_ascii_case("UtcTime") {
            Some(
                utc.format(format.unwrap_or(DEFAULT_TIME_FORMAT))
                    .to_string(),
            )
        } else if name.eq_ignore_ascii_case("LocalTime") {
            Some(
                local
                    .format(format.unwrap_or(DEFAULT_TIME_FORMAT))
                    .to_string(),
            )
        } else if name.eq_ignore_ascii_case("MachineName") {
            Some(self.context.hostname().to_string())
        } else if name.eq_ignore_ascii_case("ProcessId") {
            Some(self.context.proc_id().to_string())
        } else if name.eq_ignore_ascii_case("ProcessName") {
            Some(self.context.app_name().to_string())
        } else if name.eq_ignore_ascii_case("BaseDir") {
            Some(self.base_dir.to_string_lossy().into_owned())
        } else {
            None
        }
    }

    /// Write `value` to the (possibly freshly re-resolved) destination.
    pub fn write(&self, value: &str) -> Result<()> {
        let path = self.resolve_path();
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_writer(&mut inner, path)?;
        // ensure_writer either installed a writer or errored out above
        if let Some(writer) = inner.writer.as_mut() {
            writer
                .write_all(value.as_bytes())
                .map_err(|err| file_error(&self.template, err))?;
        }
        Ok(())
    }

    /// [`write`](RollingFileWriter::write) with a trailing newline.
    pub fn write_line(&self, value: &str) -> Result<()> {
        let path = self.resolve_path();
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ensure_writer(&mut inner, path)?;
        if let Some(writer) = inner.writer.as_mut() {
            writer
                .write_all(value.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|err| file_error(&self.template, err))?;
        }
        Ok(())
    }

    /// Flush any buffered output to the file.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(writer) = inner.writer.as_mut() {
            writer
                .flush()
                .map_err(|err| file_error(&self.template, err))?;
        }
        Ok(())
    }
}

impl Drop for RollingFileWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Insert `-<n>` ahead of the extension: `errors.log` -> `errors-2.log`.
fn suffixed_path(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}-{}", stem, n);
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn file_error(path: impl Into<PathBuf>, err: std::io::Error) -> Error {
    Error::File {
        path: path.into(),
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

// NOTE: called with the lock held.
fn ensure_writer(inner: &mut Inner, path: PathBuf) -> Result<()> {
    if inner.current_path.as_deref() == Some(path.as_path()) {
        return Ok(());
    }

    if let Some(mut old) = inner.writer.take() {
        // rotation: flush & close the outgoing handle before opening its successor
        let _ = old.flush();
        tracing::debug!(
            from = %inner.current_path.as_deref().unwrap_or(Path::new("")).display(),
            to = %path.display(),
            "rolling to a new log file"
        );
    }
    inner.current_path = None;

    for num in 0..MAX_STREAM_RETRIES {
        let candidate = if num == 0 {
            path.clone()
        } else {
            suffixed_path(&path, num)
        };
        match OpenOptions::new().append(true).create(true).open(&candidate) {
            Ok(file) => {
                inner.writer = Some(BufWriter::new(file));
                // track the *logical* path: rotation is keyed off the template resolution,
                // not whichever suffixed alternate we landed on
                inner.current_path = Some(path);
                return Ok(());
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(file_error(candidate, err));
            }
            Err(err) => {
                tracing::warn!(
                    path = %candidate.display(),
                    attempt = num + 1,
                    error = %err,
                    "couldn't open log file; trying a suffixed alternate"
                );
            }
        }
    }

    Err(Error::ExhaustedLogFileNames {
        path,
        back: Backtrace::new(),
    })
}
