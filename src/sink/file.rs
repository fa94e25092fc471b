// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::ErrorKind;
use crate::layout;
use crate::layout::Layout;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;

/// A builder to configure and create a [`File`] sink.
#[derive(Debug)]
pub struct FileBuilder {
    path: PathBuf,
    name: String,
    json: bool,
    timestamp: bool,
    layout: Option<Box<dyn Layout>>,
}

impl FileBuilder {
    /// Create a new file sink builder appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: "file".to_string(),
            json: false,
            timestamp: true,
            layout: None,
        }
    }

    /// Set the transport name. Default to `file`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Write one JSON object per line. Default to `false`.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Include the record time. Default to `true`.
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the layout picked from the flags.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Build the [`File`] sink.
    ///
    /// # Errors
    ///
    /// Return an error if either:
    ///
    /// * The path has no file name.
    /// * The parent directory cannot be created.
    /// * The file cannot be opened for appending.
    pub fn build(self) -> Result<File, Error> {
        let FileBuilder {
            path,
            name,
            json,
            timestamp,
            layout,
        } = self;

        if path.file_name().is_none() {
            return Err(Error::new(ErrorKind::Unexpected, "log file path has no file name")
                .with_context("path", path.display()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to create log directory")
                    .with_context("path", parent.display())
                    .with_source(err)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to open log file")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;

        Ok(File {
            name,
            json,
            timestamp,
            layout: layout.unwrap_or_else(|| layout::select(json, timestamp, false)),
            writer: Mutex::new(file),
            path,
        })
    }
}

/// A sink that appends log records to a single file.
#[derive(Debug)]
pub struct File {
    name: String,
    path: PathBuf,
    json: bool,
    timestamp: bool,
    layout: Box<dyn Layout>,
    writer: Mutex<fs::File>,
}

impl File {
    fn writer(&self) -> MutexGuard<'_, fs::File> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Sink for File {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(severity, record)?;
        bytes.push(b'\n');
        self.writer()
            .write_all(&bytes)
            .map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        self.writer().flush().map_err(Error::from_io_error)
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("type".into(), "file".into());
        metadata.insert("filename".into(), self.path.display().to_string().into());
        metadata.insert("json".into(), self.json.into());
        metadata.insert("timestamp".into(), self.timestamp.into());
        metadata
    }
}
