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

use std::io::Write;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout;
use crate::layout::Layout;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;

/// A sink that prints log records to stdout.
///
/// # Examples
///
/// ```
/// use logdapter::sink::Console;
///
/// let console = Console::default().colorize(true).timestamp(true);
/// ```
#[derive(Debug)]
pub struct Console {
    name: String,
    json: bool,
    colorize: bool,
    timestamp: bool,
    layout: Box<dyn Layout>,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            name: "console".to_string(),
            json: false,
            colorize: false,
            timestamp: false,
            layout: layout::select(false, false, false),
        }
    }
}

impl Console {
    /// Set the transport name. Default to `console`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Print one JSON object per record.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self.relayout()
    }

    /// Paint level names with their scale color. Ignored for JSON output.
    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self.relayout()
    }

    /// Include the record time.
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self.relayout()
    }

    /// Replace the layout picked from the flags.
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    fn relayout(mut self) -> Self {
        self.layout = layout::select(self.json, self.timestamp, self.colorize);
        self
    }
}

impl Sink for Console {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error> {
        let mut bytes = self.layout.format(severity, record)?;
        bytes.push(b'\n');
        std::io::stdout()
            .lock()
            .write_all(&bytes)
            .map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        std::io::stdout().flush().map_err(Error::from_io_error)
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("type".into(), "console".into());
        metadata.insert("json".into(), self.json.into());
        metadata.insert("colorize".into(), self.colorize.into());
        metadata.insert("timestamp".into(), self.timestamp.into());
        metadata
    }
}
