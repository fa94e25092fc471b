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

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::Error;

/// The outcome of offering one record to every transport.
#[derive(Debug, Default)]
pub struct DispatchReport {
    delivered: usize,
    failures: Vec<SinkFailure>,
}

impl DispatchReport {
    pub(super) fn delivered(&mut self) {
        self.delivered += 1;
    }

    pub(super) fn failed(&mut self, transport: &str, error: Error) {
        self.failures.push(SinkFailure {
            transport: transport.to_string(),
            error,
        });
    }

    /// How many sinks accepted the record.
    pub fn delivered_count(&self) -> usize {
        self.delivered
    }

    /// The sinks that failed, in transport order.
    pub fn failures(&self) -> &[SinkFailure] {
        &self.failures
    }

    /// Whether no sink failed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consume the report and return the failures.
    pub fn into_failures(self) -> Vec<SinkFailure> {
        self.failures
    }
}

/// A sink error observed while dispatching or flushing.
#[derive(Debug)]
pub struct SinkFailure {
    transport: String,
    error: Error,
}

impl SinkFailure {
    /// The name of the transport whose sink failed.
    pub fn transport(&self) -> &str {
        &self.transport
    }

    /// The sink error, of kind [`SinkWrite`](crate::ErrorKind::SinkWrite).
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Consume the failure and return the sink error.
    pub fn into_error(self) -> Error {
        self.error
    }
}

/// A snapshot of one transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInfo {
    pub name: String,
    pub enabled: bool,
    pub level: String,
    pub default_level: String,
    pub metadata: Map<String, Value>,
}
