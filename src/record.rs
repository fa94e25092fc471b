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

//! Log record.

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

/// The payload of a log message.
///
/// The severity is not part of the record: it is passed alongside the record on dispatch and
/// resolved against the severity scale before any sink sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    // the observed time
    time: Timestamp,

    target: String,
    message: String,

    // structural logging
    kvs: Map<String, Value>,
}

impl Record {
    /// Create a record observed now with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Record::builder().message(message).build()
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The name of the component that emitted the record. Empty if unset.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The key-values.
    pub fn key_values(&self) -> &Map<String, Value> {
        &self.kvs
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                time: Timestamp::now(),
                target: String::new(),
                message: String::new(),
                kvs: Map::new(),
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, time: Timestamp) -> Self {
        self.record.time = time;
        self
    }

    /// Set [`target`](Record::target).
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.record.target = target.into();
        self
    }

    /// Set [`message`](Record::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = message.into();
        self
    }

    /// Add one key-value pair. A repeated key overwrites the previous value.
    pub fn key_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.kvs.insert(key.into(), value.into());
        self
    }

    /// Invoke the builder and return a `Record`.
    pub fn build(self) -> Record {
        self.record
    }
}

impl From<&str> for Record {
    fn from(message: &str) -> Self {
        Record::new(message)
    }
}

impl From<String> for Record {
    fn from(message: String) -> Self {
        Record::new(message)
    }
}
