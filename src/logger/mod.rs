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

//! The logger facade over a [`TransportSet`].

use std::sync::Arc;

use crate::Error;
use crate::level::Levels;
use crate::record::Record;
use crate::transport::DispatchReport;
use crate::transport::Targets;
use crate::transport::TransportInfo;
use crate::transport::TransportSet;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

mod default;
mod log_impl;

pub use self::default::default_logger;
pub use self::default::set_default_logger;

/// A cheap-to-clone handle logging through a shared [`TransportSet`].
///
/// Clones share the transports, so reconfiguring through one handle is visible through all.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logdapter::Logger;
/// use logdapter::level::Levels;
/// use logdapter::sink::Testing;
/// use logdapter::transport::TransportEntry;
/// use logdapter::transport::TransportSet;
///
/// let transports = TransportSet::new(
///     Arc::new(Levels::default()),
///     vec![TransportEntry::new(Testing::default(), "warn")],
/// )
/// .unwrap();
/// let logger = Logger::new(transports);
///
/// logger.error("connection lost").unwrap();
/// assert!(!logger.is_level_enabled("info").unwrap());
///
/// logger.set_level("debug", ["testing"]);
/// assert!(logger.is_level_enabled("info").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    transports: Arc<TransportSet>,
    trap: Arc<dyn Trap>,
}

impl From<TransportSet> for Logger {
    fn from(transports: TransportSet) -> Self {
        Logger::new(transports)
    }
}

impl Logger {
    /// Create a logger owning `transports`.
    pub fn new(transports: TransportSet) -> Logger {
        Logger {
            transports: Arc::new(transports),
            trap: Arc::new(DefaultTrap::default()),
        }
    }

    /// Set the trap receiving failures that cannot be returned, i.e. those on the
    /// [`log::Log`] path.
    pub fn with_trap(mut self, trap: impl Trap) -> Logger {
        self.trap = Arc::new(trap);
        self
    }

    /// The shared transports.
    pub fn transports(&self) -> &Arc<TransportSet> {
        &self.transports
    }

    /// The severity scale.
    pub fn levels(&self) -> &Arc<Levels> {
        self.transports.levels()
    }

    /// Log `record` at the named level.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::UnknownLevel`](crate::ErrorKind::UnknownLevel) error if the
    /// level is not part of the scale. Sink failures are reported in the returned
    /// [`DispatchReport`].
    pub fn log(&self, level: &str, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.transports.dispatch(level, &record.into())
    }

    /// Log at `error`.
    pub fn error(&self, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.log("error", record)
    }

    /// Log at `warn`.
    pub fn warn(&self, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.log("warn", record)
    }

    /// Log at `trace`.
    pub fn trace(&self, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.log("trace", record)
    }

    /// Log at `info`.
    pub fn info(&self, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.log("info", record)
    }

    /// Log at `debug`.
    pub fn debug(&self, record: impl Into<Record>) -> Result<DispatchReport, Error> {
        self.log("debug", record)
    }

    /// Move the threshold of the targeted transports. An unknown level changes nothing.
    pub fn set_level(&self, level: &str, targets: impl Into<Targets>) {
        self.transports.set_threshold(level, targets);
    }

    /// Enable or disable the targeted transports. `None` changes nothing.
    pub fn activate(&self, enabled: Option<bool>, targets: impl Into<Targets>) {
        self.transports.activate(enabled, targets);
    }

    /// Restore every transport's threshold to its configured level.
    pub fn reset_default_levels(&self) {
        self.transports.reset_to_defaults();
    }

    /// Whether a record at `level` would reach at least one transport.
    pub fn is_level_enabled(&self, level: &str) -> Result<bool, Error> {
        self.transports.is_level_enabled(level)
    }

    pub fn transport_info(&self, name: &str) -> Option<TransportInfo> {
        self.transports.transport_info(name)
    }

    pub fn transport_infos(&self) -> Vec<TransportInfo> {
        self.transports.transport_infos()
    }

    pub fn disabled_transports(&self) -> Vec<String> {
        self.transports.disabled_transports()
    }

    /// Flush every sink.
    pub fn flush(&self) -> DispatchReport {
        self.transports.flush()
    }

    fn trap_report(&self, report: DispatchReport) {
        for failure in report.into_failures() {
            self.trap.trap(failure.error());
        }
    }
}
