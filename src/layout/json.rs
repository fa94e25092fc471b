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

use jiff::tz::TimeZone;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::level::Severity;
use crate::record::Record;

/// A JSON layout for formatting log records.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2024-08-11T22:44:57.172051+08:00","level":"error","target":"billing","message":"payment rejected","kvs":{"order":42}}
/// {"timestamp":"2024-08-11T22:44:57.172187+08:00","level":"warn","message":"retrying"}
/// ```
///
/// # Examples
///
/// ```
/// use logdapter::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Debug, Clone)]
pub struct JsonLayout {
    timestamp: bool,
    tz: Option<TimeZone>,
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self {
            timestamp: true,
            tz: None,
        }
    }
}

impl JsonLayout {
    /// Include the `timestamp` field. Default to `true`.
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logdapter::layout::JsonLayout;
    ///
    /// let json_layout = JsonLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

#[derive(Debug, Serialize)]
struct RecordLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    level: &'a str,
    #[serde(skip_serializing_if = "str_is_empty")]
    target: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "map_is_empty")]
    kvs: &'a Map<String, Value>,
}

fn str_is_empty(s: &&str) -> bool {
    s.is_empty()
}

fn map_is_empty(m: &&Map<String, Value>) -> bool {
    m.is_empty()
}

impl Layout for JsonLayout {
    fn format(&self, severity: Severity<'_>, record: &Record) -> Result<Vec<u8>, Error> {
        let timestamp = self.timestamp.then(|| {
            let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
            let time = record.time().to_zoned(tz);
            time.strftime("%Y-%m-%dT%H:%M:%S.%6f%:z").to_string()
        });

        let record_line = RecordLine {
            timestamp,
            level: severity.name(),
            target: record.target(),
            message: record.message(),
            kvs: record.key_values(),
        };

        serde_json::to_vec(&record_line).map_err(Error::from_json_error)
    }
}
