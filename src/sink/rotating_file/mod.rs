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

//! A file sink that starts a new file whenever the formatted date changes.

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Map;
use serde_json::Value;

use self::clock::Clock;
use self::pattern::DatePattern;
use self::writer::DateRotatingWriter;
use crate::Error;
use crate::layout;
use crate::layout::Layout;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

mod clock;
mod pattern;
mod writer;

/// The date pattern used when none is configured.
pub const DEFAULT_DATE_PATTERN: &str = ".yyyy-MM-dd";

/// A builder to configure and create a [`RotatingFile`] sink.
#[derive(Debug)]
pub struct RotatingFileBuilder {
    filename: PathBuf,
    date_pattern: String,
    name: String,
    json: bool,
    timestamp: bool,
    max_size: Option<NonZeroUsize>,
    max_files: Option<NonZeroUsize>,
    layout: Option<Box<dyn Layout>>,
    trap: Box<dyn Trap>,
}

impl RotatingFileBuilder {
    /// Create a new builder.
    ///
    /// Records go to `filename` immediately followed by the current time rendered with
    /// `date_pattern`. The pattern understands `yyyy`, `yy`, `MM`, `dd`, `HH`, `mm` and `ss`;
    /// every other character is copied as is.
    ///
    /// ```
    /// use logdapter::sink::RotatingFileBuilder;
    ///
    /// // writes to logs/app.log.2024-08-10 on that day
    /// let builder = RotatingFileBuilder::new("logs/app.log", ".yyyy-MM-dd");
    /// ```
    pub fn new(filename: impl Into<PathBuf>, date_pattern: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            date_pattern: date_pattern.into(),
            name: "dailyRotateFile".to_string(),
            json: false,
            timestamp: true,
            max_size: None,
            max_files: None,
            layout: None,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the transport name. Default to `dailyRotateFile`.
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

    /// Split a period into numbered parts once a part reaches `max_size` bytes.
    pub fn max_size(mut self, max_size: NonZeroUsize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Keep at most `max_files` files sharing the filename prefix.
    pub fn max_files(mut self, max_files: NonZeroUsize) -> Self {
        self.max_files = Some(max_files);
        self
    }

    /// Replace the layout picked from the flags.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Set the trap receiving rotation failures.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`RotatingFile`] sink.
    ///
    /// # Errors
    ///
    /// Return an error if the date pattern is empty, or if the first file cannot be opened.
    pub fn build(self) -> Result<RotatingFile, Error> {
        self.build_with_clock(Clock::DefaultClock)
    }

    fn build_with_clock(self, clock: Clock) -> Result<RotatingFile, Error> {
        let RotatingFileBuilder {
            filename,
            date_pattern,
            name,
            json,
            timestamp,
            max_size,
            max_files,
            layout,
            trap,
        } = self;

        let pattern = DatePattern::parse(&date_pattern)?;
        let metadata = {
            let mut metadata = Map::new();
            metadata.insert("type".into(), "dailyRotateFile".into());
            metadata.insert("filename".into(), filename.display().to_string().into());
            metadata.insert("datePattern".into(), pattern.as_str().into());
            metadata.insert("json".into(), json.into());
            metadata.insert("timestamp".into(), timestamp.into());
            if let Some(max_size) = max_size {
                metadata.insert("maxsize".into(), max_size.get().into());
            }
            if let Some(max_files) = max_files {
                metadata.insert("maxFiles".into(), max_files.get().into());
            }
            metadata
        };

        let writer =
            DateRotatingWriter::open(filename, pattern, max_size, max_files, clock, trap)?;

        Ok(RotatingFile {
            name,
            metadata,
            layout: layout.unwrap_or_else(|| layout::select(json, timestamp, false)),
            writer: Mutex::new(writer),
        })
    }
}

/// A sink writing to date-suffixed files.
#[derive(Debug)]
pub struct RotatingFile {
    name: String,
    metadata: Map<String, Value>,
    layout: Box<dyn Layout>,
    writer: Mutex<DateRotatingWriter>,
}

impl RotatingFile {
    fn writer(&self) -> MutexGuard<'_, DateRotatingWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The file currently written to.
    pub fn current_path(&self) -> PathBuf {
        self.writer().current_path()
    }
}

impl Sink for RotatingFile {
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
        self.metadata.clone()
    }
}
