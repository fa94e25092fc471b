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

use serde_json::Value;

use super::Logger;
use crate::record::Record;

fn level_name(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "error",
        log::Level::Warn => "warn",
        log::Level::Info => "info",
        log::Level::Debug => "debug",
        log::Level::Trace => "trace",
    }
}

fn to_json(value: &log::kv::Value<'_>) -> Value {
    if let Some(v) = value.to_bool() {
        Value::from(v)
    } else if let Some(v) = value.to_i64() {
        Value::from(v)
    } else if let Some(v) = value.to_u64() {
        Value::from(v)
    } else if let Some(v) = value.to_f64() {
        Value::from(v)
    } else if let Some(v) = value.to_borrowed_str() {
        Value::from(v)
    } else {
        Value::from(value.to_string())
    }
}

struct KeyValueVisitor {
    builder: Option<crate::record::RecordBuilder>,
}

impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueVisitor {
    fn visit_pair(
        &mut self,
        key: log::kv::Key<'kvs>,
        value: log::kv::Value<'kvs>,
    ) -> Result<(), log::kv::Error> {
        self.builder = self
            .builder
            .take()
            .map(|builder| builder.key_value(key.as_str(), to_json(&value)));
        Ok(())
    }
}

impl Logger {
    /// Install this logger as the [`log`] crate's global logger.
    ///
    /// [`log::Level`]s map to the scale names `error`, `warn`, `info`, `debug` and `trace`.
    /// A name the scale lacks is never enabled.
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been installed.
    pub fn try_apply(self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }

    /// Install this logger as the [`log`] crate's global logger.
    ///
    /// # Panics
    ///
    /// Panic if a global logger has already been installed.
    pub fn apply(self) {
        self.try_apply()
            .expect("Logger::apply should not be called after the global logger initialized");
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.transports
            .is_level_enabled(level_name(metadata.level()))
            .unwrap_or(false)
    }

    fn log(&self, record: &log::Record) {
        let level = level_name(record.level());
        if !self.transports.is_level_enabled(level).unwrap_or(false) {
            return;
        }

        let mut visitor = KeyValueVisitor {
            builder: Some(
                Record::builder()
                    .target(record.target())
                    .message(record.args().to_string()),
            ),
        };
        if let Err(err) = record.key_values().visit(&mut visitor) {
            let err = crate::Error::new(crate::ErrorKind::Unexpected, "failed to visit key-values")
                .with_source(anyhow::anyhow!("{err}"));
            self.trap.trap(&err);
        }
        let Some(builder) = visitor.builder else {
            return;
        };

        match self.transports.dispatch(level, &builder.build()) {
            Ok(report) => self.trap_report(report),
            Err(err) => self.trap.trap(&err),
        }
    }

    fn flush(&self) {
        self.trap_report(Logger::flush(self));
    }
}
