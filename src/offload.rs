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

//! Exception offload: full detail to disk, correlation id to the wire.
//!
//! Stack traces don't survive a 2048-byte budget, and they're exactly the payload you want intact
//! when something breaks. [`ExceptionOffloader`] writes the complete exception chain to a file
//! named by a fresh correlation id, then attaches the id & path to the record's (reserved)
//! properties; the structured-data encoder surfaces the path as `EventLog`, so the trimmed wire
//! message still points at the full detail.
//!
//! The target folder is validated at construction-- a folder that can't be created is a
//! configuration error raised at activation time, never a per-record one.

use crate::{
    context::SourceContext,
    error::{Error, Result},
    record::{LogRecord, PROP_EXCEPTION_ID, PROP_EXCEPTION_LOG},
    rolling::RollingFileWriter,
};

use backtrace::Backtrace;

use std::path::PathBuf;

const ID_TOKEN: &str = "{ErrorId}";

const DEFAULT_FILE_NAME: &str = "error_{ErrorId}.txt";

/// Writes exception detail files and stamps records with the correlation id linking to them.
pub struct ExceptionOffloader {
    folder: PathBuf,
    file_template: String,
    context: SourceContext,
}

impl ExceptionOffloader {
    /// Construct an offloader targeting `folder`, creating it if needed.
    pub fn new(folder: impl Into<PathBuf>, context: SourceContext) -> Result<ExceptionOffloader> {
        let folder = folder.into();
        std::fs::create_dir_all(&folder).map_err(|err| Error::MissingFolder {
            path: folder.clone(),
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        Ok(ExceptionOffloader {
            folder,
            file_template: DEFAULT_FILE_NAME.to_string(),
            context,
        })
    }

    /// Override the filename template. Must contain `{ErrorId}` somewhere, or every offload
    /// would land on the same file.
    pub fn with_file_template(mut self, template: impl Into<String>) -> Self {
        self.file_template = template.into();
        self
    }

    pub fn folder(&self) -> &PathBuf {
        &self.folder
    }

    /// Generate a correlation id, persist `record`'s exception chain, and stamp the record.
    ///
    /// Returns `Ok(None)` for records with no exception attached. We dump the detail to the file
    /// and never touch that file again, so no locking beyond the rolling writer's own is needed.
    pub fn offload(&self, record: &mut LogRecord) -> Result<Option<(String, PathBuf)>> {
        let detail = match &record.exception {
            Some(exception) => exception.detail(),
            None => return Ok(None),
        };

        let id = uuid::Uuid::new_v4().simple().to_string();
        let file_name = self.file_template.replace(ID_TOKEN, &id);
        let path = self.folder.join(file_name);

        let writer =
            RollingFileWriter::new(path.to_string_lossy().into_owned(), self.context.clone());
        writer.write(&detail)?;
        writer.flush()?;

        record.set_property(PROP_EXCEPTION_ID, &id);
        record.set_property(PROP_EXCEPTION_LOG, path.to_string_lossy().into_owned());

        Ok(Some((id, path)))
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::record::ExceptionInfo;
    use crate::severity::Severity;

    use tempfile::TempDir;

    fn test_context() -> SourceContext {
        SourceContext::default()
            .with_hostname("bree.local")
            .with_app_name("prototyping")
            .with_proc_id("123")
    }

    #[test]
    fn creates_missing_folder() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("errs");
        assert!(!target.exists());
        let offloader = ExceptionOffloader::new(&target, test_context()).unwrap();
        assert!(offloader.folder().is_dir());
    }

    #[test]
    fn uncreatable_folder_is_fatal() {
        let tmp = TempDir::new().unwrap();
        // a file where the folder should go
        let clash = tmp.path().join("errs");
        std::fs::write(&clash, b"in the way").unwrap();
        assert!(ExceptionOffloader::new(&clash, test_context()).is_err());
    }

    #[test]
    fn offload_writes_detail_and_stamps_record() {
        let tmp = TempDir::new().unwrap();
        let offloader = ExceptionOffloader::new(tmp.path().join("errs"), test_context()).unwrap();

        let mut record = LogRecord::builder(Severity::Error, "boom")
            .exception(ExceptionInfo::new(
                "System.ArgumentNullException",
                "Value cannot be null.",
            ))
            .build();

        let (id, path) = offloader.offload(&mut record).unwrap().unwrap();

        // 32 lowercase hex chars
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));

        // file named error_<id>.txt under the folder, containing the message text
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("error_{}.txt", id)
        );
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Message : Value cannot be null.\n"));

        // the record now carries the matching correlation id & file pointer
        assert_eq!(record.property(PROP_EXCEPTION_ID), Some(id.as_str()));
        assert_eq!(
            record.property(PROP_EXCEPTION_LOG),
            Some(path.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn offload_without_exception_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let offloader = ExceptionOffloader::new(tmp.path().join("errs"), test_context()).unwrap();
        let mut record = LogRecord::builder(Severity::Info, "fine").build();
        assert!(offloader.offload(&mut record).unwrap().is_none());
        assert_eq!(record.property(PROP_EXCEPTION_ID), None);
    }

    #[test]
    fn distinct_offloads_get_distinct_ids() {
        let tmp = TempDir::new().unwrap();
        let offloader = ExceptionOffloader::new(tmp.path().join("errs"), test_context()).unwrap();
        let mut a = LogRecord::builder(Severity::Error, "a")
            .exception(ExceptionInfo::new("E", "first"))
            .build();
        let mut b = LogRecord::builder(Severity::Error, "b")
            .exception(ExceptionInfo::new("E", "second"))
            .build();
        let (id_a, path_a) = offloader.offload(&mut a).unwrap().unwrap();
        let (id_b, path_b) = offloader.offload(&mut b).unwrap().unwrap();
        assert_ne!(id_a, id_b);
        assert_ne!(path_a, path_b);
    }
}
