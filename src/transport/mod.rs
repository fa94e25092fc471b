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

//! The transport set: per-transport gating and live reconfiguration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::ErrorKind;
use crate::level::Levels;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;

mod entry;
mod report;

pub use self::entry::Targets;
pub use self::entry::TransportEntry;
pub use self::report::DispatchReport;
pub use self::report::SinkFailure;
pub use self::report::TransportInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct State {
    // index into the severity scale
    threshold: usize,
    enabled: bool,
}

#[derive(Debug)]
struct Transport {
    name: String,
    sink: Arc<dyn Sink>,
    state: Mutex<State>,
    default_threshold: usize,
    metadata: Map<String, Value>,
}

impl Transport {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // one consistent copy of the threshold and the enabled flag
    fn snapshot(&self) -> State {
        *self.state()
    }
}

/// The registered transports and their live state.
///
/// The set of transports is fixed at construction. Each transport guards its threshold and
/// enabled flag with its own lock, so concurrent mutation of one transport never blocks
/// dispatch to another, and a dispatch never observes a half-applied update.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logdapter::level::Levels;
/// use logdapter::record::Record;
/// use logdapter::sink::Testing;
/// use logdapter::transport::TransportEntry;
/// use logdapter::transport::TransportSet;
///
/// let transports = TransportSet::new(
///     Arc::new(Levels::default()),
///     vec![TransportEntry::new(Testing::default(), "trace")],
/// )
/// .unwrap();
///
/// assert!(transports.is_level_enabled("warn").unwrap());
/// assert!(!transports.is_level_enabled("debug").unwrap());
///
/// let report = transports.dispatch("error", &Record::new("disk full")).unwrap();
/// assert_eq!(report.delivered_count(), 1);
/// ```
#[derive(Debug)]
pub struct TransportSet {
    levels: Arc<Levels>,
    transports: Vec<Transport>,
    index: HashMap<String, usize>,
}

impl TransportSet {
    /// Register `entries` in order.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::UnknownLevel`] error if any entry threshold is not part of the
    /// scale, or an [`ErrorKind::DuplicateTransport`] error if two entries share a name.
    /// Nothing is registered when construction fails.
    pub fn new(levels: Arc<Levels>, entries: Vec<TransportEntry>) -> Result<TransportSet, Error> {
        let mut transports = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for entry in entries {
            let name = entry.resolved_name();
            let threshold = levels.index_of(&entry.threshold).ok_or_else(|| {
                Error::unknown_level(&entry.threshold).with_context("transport", &name)
            })?;
            if index.insert(name.clone(), transports.len()).is_some() {
                return Err(Error::new(
                    ErrorKind::DuplicateTransport,
                    "transport name registered twice",
                )
                .with_context("transport", name));
            }

            let metadata = entry.sink.metadata();
            transports.push(Transport {
                name,
                sink: entry.sink,
                state: Mutex::new(State {
                    threshold,
                    enabled: entry.enabled,
                }),
                default_threshold: threshold,
                metadata,
            });
        }

        Ok(TransportSet {
            levels,
            transports,
            index,
        })
    }

    /// A set without transports. Every level reports as disabled.
    pub fn empty(levels: Arc<Levels>) -> TransportSet {
        TransportSet {
            levels,
            transports: vec![],
            index: HashMap::new(),
        }
    }

    /// The severity scale this set gates against.
    pub fn levels(&self) -> &Arc<Levels> {
        &self.levels
    }

    /// Offer `record` at `severity` to every enabled transport whose threshold passes it.
    ///
    /// A failing sink does not stop delivery to the remaining ones; its error is collected in
    /// the returned report.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::UnknownLevel`] error, without touching any sink, if `severity`
    /// is not part of the scale.
    pub fn dispatch(&self, severity: &str, record: &Record) -> Result<DispatchReport, Error> {
        let severity = self
            .levels
            .get(severity)
            .ok_or_else(|| Error::unknown_level(severity))?;

        let mut report = DispatchReport::default();
        for transport in &self.transports {
            if !self.accepts(transport, severity) {
                continue;
            }

            match transport.sink.write(severity, record) {
                Ok(()) => report.delivered(),
                Err(err) => {
                    let err = Error::new(ErrorKind::SinkWrite, "sink failed to write record")
                        .with_context("transport", &transport.name)
                        .with_source(err);
                    report.failed(&transport.name, err);
                }
            }
        }

        Ok(report)
    }

    /// Whether any enabled transport would accept a record at `severity`.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::UnknownLevel`] error if `severity` is not part of the scale.
    pub fn is_level_enabled(&self, severity: &str) -> Result<bool, Error> {
        let severity = self
            .levels
            .get(severity)
            .ok_or_else(|| Error::unknown_level(severity))?;

        Ok(self
            .transports
            .iter()
            .any(|transport| self.accepts(transport, severity)))
    }

    fn accepts(&self, transport: &Transport, severity: Severity<'_>) -> bool {
        let state = transport.snapshot();
        state.enabled && severity.passes(self.levels.severity_at(state.threshold))
    }

    /// Move the threshold of the targeted transports to `severity`.
    ///
    /// An unknown `severity` leaves every threshold unchanged.
    pub fn set_threshold(&self, severity: &str, targets: impl Into<Targets>) {
        let Some(threshold) = self.levels.index_of(severity) else {
            return;
        };
        let targets = targets.into();
        for transport in self.targeted(&targets) {
            transport.state().threshold = threshold;
        }
    }

    /// Enable or disable the targeted transports. `None` changes nothing.
    pub fn activate(&self, enabled: Option<bool>, targets: impl Into<Targets>) {
        let Some(enabled) = enabled else {
            return;
        };
        let targets = targets.into();
        for transport in self.targeted(&targets) {
            transport.state().enabled = enabled;
        }
    }

    /// Restore every threshold to the one given at construction.
    pub fn reset_to_defaults(&self) {
        for transport in &self.transports {
            transport.state().threshold = transport.default_threshold;
        }
    }

    /// Snapshot the named transport.
    pub fn transport_info(&self, name: &str) -> Option<TransportInfo> {
        let &i = self.index.get(name)?;
        Some(self.info(&self.transports[i]))
    }

    /// Snapshot every transport, in registration order.
    pub fn transport_infos(&self) -> Vec<TransportInfo> {
        self.transports.iter().map(|t| self.info(t)).collect()
    }

    /// The names of the transports that are currently disabled.
    pub fn disabled_transports(&self) -> Vec<String> {
        self.transports
            .iter()
            .filter(|t| !t.snapshot().enabled)
            .map(|t| t.name.clone())
            .collect()
    }

    /// Flush every sink, enabled or not.
    pub fn flush(&self) -> DispatchReport {
        let mut report = DispatchReport::default();
        for transport in &self.transports {
            match transport.sink.flush() {
                Ok(()) => report.delivered(),
                Err(err) => {
                    let err = Error::new(ErrorKind::SinkWrite, "sink failed to flush")
                        .with_context("transport", &transport.name)
                        .with_source(err);
                    report.failed(&transport.name, err);
                }
            }
        }
        report
    }

    fn targeted<'a>(&'a self, targets: &'a Targets) -> impl Iterator<Item = &'a Transport> {
        self.transports
            .iter()
            .filter(move |t| targets.matches(&t.name))
    }

    fn info(&self, transport: &Transport) -> TransportInfo {
        let state = transport.snapshot();
        TransportInfo {
            name: transport.name.clone(),
            enabled: state.enabled,
            level: self.levels.severity_at(state.threshold).name().to_string(),
            default_level: self
                .levels
                .severity_at(transport.default_threshold)
                .name()
                .to_string(),
            metadata: transport.metadata.clone(),
        }
    }
}
