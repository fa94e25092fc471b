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

use std::sync::Arc;

use crate::sink::Sink;

/// One sink to register, with its initial threshold and activation state.
#[derive(Debug, Clone)]
pub struct TransportEntry {
    pub(super) name: Option<String>,
    pub(super) sink: Arc<dyn Sink>,
    pub(super) threshold: String,
    pub(super) enabled: bool,
}

impl TransportEntry {
    /// Create an enabled entry for `sink` at `threshold`.
    ///
    /// The transport is named after [`Sink::name`] unless [`TransportEntry::name`] overrides it.
    pub fn new(sink: impl Sink, threshold: impl Into<String>) -> Self {
        Self::shared(Arc::new(sink), threshold)
    }

    /// Create an enabled entry for a sink that is also held elsewhere.
    pub fn shared(sink: Arc<dyn Sink>, threshold: impl Into<String>) -> Self {
        Self {
            name: None,
            sink,
            threshold: threshold.into(),
            enabled: true,
        }
    }

    /// Register the transport under `name` instead of the sink's own name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the initial activation state. Default to `true`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub(super) fn resolved_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.sink.name().to_string(),
        }
    }
}

/// The transports a mutation applies to.
///
/// An empty named set means every transport. Names that match no transport are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Targets {
    #[default]
    All,
    Named(Vec<String>),
}

impl Targets {
    pub(super) fn matches(&self, name: &str) -> bool {
        match self {
            Targets::All => true,
            Targets::Named(names) => names.is_empty() || names.iter().any(|n| n == name),
        }
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        Targets::Named(vec![name.to_string()])
    }
}

impl From<String> for Targets {
    fn from(name: String) -> Self {
        Targets::Named(vec![name])
    }
}

impl From<Vec<String>> for Targets {
    fn from(names: Vec<String>) -> Self {
        Targets::Named(names)
    }
}

impl From<Vec<&str>> for Targets {
    fn from(names: Vec<&str>) -> Self {
        Targets::Named(names.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Targets {
    fn from(names: &[&str]) -> Self {
        Targets::Named(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(names: [&str; N]) -> Self {
        Targets::Named(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<T: Into<Targets>> From<Option<T>> for Targets {
    fn from(targets: Option<T>) -> Self {
        targets.map(Into::into).unwrap_or_default()
    }
}
