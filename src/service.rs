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

//! Build a logger from a declarative configuration.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::Error;
use crate::ErrorKind;
use crate::Logger;
use crate::config;
use crate::config::LoggerConfig;
use crate::config::ServiceConfig;
use crate::config::TransportConfig;
use crate::config::TransportKind;
use crate::level::DEFAULT_LEVELS;
use crate::level::Levels;
use crate::record::Record;
use crate::sink::Console;
use crate::sink::DirectoryCollection;
use crate::sink::DocumentStoreBuilder;
use crate::sink::FileBuilder;
use crate::sink::NetworkCollectorBuilder;
use crate::sink::RotatingFileBuilder;
use crate::sink::Sink;
use crate::transport::TransportEntry;
use crate::transport::TransportInfo;
use crate::transport::TransportSet;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A logger built from a [`ServiceConfig`], plus introspection over it.
///
/// # Examples
///
/// ```
/// use logdapter::Service;
/// use serde_json::json;
///
/// let service = Service::new(json!({
///     "logger": {
///         "transports": [
///             { "type": "console", "level": "warn" },
///             { "type": "console", "name": "audit", "enabled": false }
///         ]
///     }
/// }))
/// .unwrap();
///
/// let info = service.service_info();
/// assert_eq!(info.transports.len(), 2);
/// assert_eq!(info.disabled_transports, vec!["audit"]);
/// ```
#[derive(Debug)]
pub struct Service {
    config: ServiceConfig,
    logger: Logger,
}

/// A snapshot of the scale and the transports of a [`Service`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub levels: BTreeMap<String, i64>,
    pub colors: BTreeMap<String, String>,
    pub transports: Vec<TransportInfo>,
    pub disabled_transports: Vec<String>,
}

impl Service {
    /// Validate `config`, unless it says `"validated": true`, and build the service.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::ConfigInvalid`] error carrying every violation as context if
    /// validation fails or the value does not deserialize, and any error of
    /// [`Service::from_config`].
    pub fn new(config: Value) -> Result<Service, Error> {
        let validated = config
            .get("validated")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !validated {
            let validation = config::validate(&config);
            if !validation.is_ok() {
                let mut err =
                    Error::new(ErrorKind::ConfigInvalid, "configuration validation failed");
                for violation in validation.violations {
                    err = err.with_context("violation", violation);
                }
                return Err(err);
            }
        }

        let config = serde_json::from_value::<ServiceConfig>(config).map_err(|err| {
            Error::new(ErrorKind::ConfigInvalid, "failed to deserialize configuration")
                .with_source(err)
        })?;
        Service::from_config(config)
    }

    /// Build the service from a typed configuration without validating it.
    ///
    /// # Errors
    ///
    /// Return an error if the scale is invalid, a transport level is unknown, two transports
    /// share a name, or a sink cannot be built.
    pub fn from_config(config: ServiceConfig) -> Result<Service, Error> {
        let levels = Arc::new(resolve_levels(&config.logger)?);
        let default_level = resolve_default_level(&config.logger, &levels);

        let mut entries = Vec::with_capacity(config.logger.transports.len().max(1));
        for transport in &config.logger.transports {
            let threshold = transport_level(transport, &levels, &default_level);
            let sink = build_sink(transport)?;
            let entry = TransportEntry::shared(sink, threshold).enabled(!transport.starts_disabled());
            entries.push(entry);
        }
        if entries.is_empty() {
            entries.push(fallback_console(&default_level));
        }

        let logger = Logger::new(TransportSet::new(levels, entries)?);
        if config.logger.exception_caught {
            install_panic_hook(logger.clone());
        }

        Ok(Service { config, logger })
    }

    /// The logger over the configured transports.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The configuration the service was built from.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Snapshot the scale and every transport.
    pub fn service_info(&self) -> ServiceInfo {
        let levels = self.logger.levels();
        ServiceInfo {
            levels: levels.ranks(),
            colors: levels.colors(),
            transports: self.logger.transport_infos(),
            disabled_transports: self.logger.disabled_transports(),
        }
    }

    /// Render [`Service::service_info`] as a labelled record for help screens.
    ///
    /// # Errors
    ///
    /// Return an error if the snapshot cannot be serialized.
    pub fn service_help(&self) -> Result<Value, Error> {
        let info = self.service_info();
        let levels = pretty(&info.levels)?;
        let colors = pretty(&info.colors)?;
        let transports = pretty(&info.transports)?;

        Ok(json!({
            "type": "record",
            "title": "Logdapter information",
            "label": {
                "logger_levels": "Levels",
                "logger_colors": "Colors",
                "transports": "Defined transports",
                "disabled_transport_names": "Disabled transports"
            },
            "data": {
                "logger_levels": levels,
                "logger_colors": colors,
                "transports": transports,
                "disabled_transport_names": info.disabled_transports
            }
        }))
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(Error::from_json_error)
}

/// The console transport used when no transport is configured.
pub(crate) fn fallback_console(level: &str) -> TransportEntry {
    let console = Console::default()
        .json(false)
        .timestamp(true)
        .colorize(true);
    TransportEntry::new(console, level)
}

fn resolve_levels(config: &LoggerConfig) -> Result<Levels, Error> {
    let mut colors = BTreeMap::new();
    if config.levels.is_none() {
        for (name, _, color) in DEFAULT_LEVELS {
            colors.insert(name.to_string(), color.to_string());
        }
    }
    if let Some(custom) = &config.colors {
        colors.extend(custom.clone());
    }

    match &config.levels {
        Some(levels) => Levels::new(levels.iter().map(|(n, r)| (n.clone(), *r)), colors),
        None => Levels::new(DEFAULT_LEVELS.iter().map(|(n, r, _)| (*n, *r)), colors),
    }
}

fn resolve_default_level(config: &LoggerConfig, levels: &Levels) -> String {
    let level = match &config.default_level {
        Some(level) => level.as_str(),
        None => config::environment_default_level(),
    };
    if levels.contains(level) {
        level.to_string()
    } else {
        levels.most_verbose().name().to_string()
    }
}

fn transport_level(transport: &TransportConfig, levels: &Levels, default_level: &str) -> String {
    if let Some(level) = &transport.common.level {
        return level.clone();
    }
    match transport.kind.default_level() {
        Some(level) if levels.contains(level) => level.to_string(),
        _ => default_level.to_string(),
    }
}

fn build_sink(transport: &TransportConfig) -> Result<Arc<dyn Sink>, Error> {
    let name = transport.name();
    let sink: Arc<dyn Sink> = match &transport.kind {
        TransportKind::Console(console) => Arc::new(
            Console::default()
                .name(name)
                .json(console.json)
                .colorize(console.colorize)
                .timestamp(console.timestamp),
        ),
        TransportKind::File(file) => Arc::new(
            FileBuilder::new(file.filename.clone())
                .name(name)
                .json(file.json)
                .timestamp(file.timestamp)
                .build()?,
        ),
        TransportKind::RotatingFile(rotating) => {
            let mut builder =
                RotatingFileBuilder::new(rotating.filename.clone(), rotating.date_pattern.clone())
                    .name(name)
                    .json(rotating.json)
                    .timestamp(rotating.timestamp);
            if let Some(max_size) = rotating.max_size.and_then(NonZeroUsize::new) {
                builder = builder.max_size(max_size);
            }
            if let Some(max_files) = rotating.max_files.and_then(NonZeroUsize::new) {
                builder = builder.max_files(max_files);
            }
            Arc::new(builder.build()?)
        }
        TransportKind::NetworkCollector(collector) => {
            let mut builder = NetworkCollectorBuilder::new(collector.host.clone())
                .name(name)
                .port(collector.port)
                .max_connect_retries(collector.max_connect_retries)
                .timeout_connect_retries(Duration::from_millis(collector.timeout_connect_retries))
                .reconnect_cooldown(Duration::from_millis(collector.reconnect_cooldown));
            if let Some(limit) = NonZeroUsize::new(collector.buffered_lines_limit) {
                builder = builder.buffered_lines_limit(limit);
            }
            if let Some(node_name) = &collector.node_name {
                builder = builder.node_name(node_name.clone());
            }
            Arc::new(builder.build()?)
        }
        TransportKind::DocumentStore(store) => {
            let collection = DirectoryCollection::open(&store.db, &store.collection)?;
            let mut builder = DocumentStoreBuilder::new(collection)
                .name(name)
                .location(store.db.clone(), store.collection.clone())
                .store_host(store.store_host);
            if let Some(label) = &store.label {
                builder = builder.label(label.clone());
            }
            Arc::new(builder.build())
        }
    };
    Ok(sink)
}

fn install_panic_hook(logger: Logger) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            message.to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "panic with a non-string payload".to_string()
        };

        let mut record = Record::builder().target("panic").message(message);
        if let Some(location) = info.location() {
            record = record.key_value("location", location.to_string());
        }
        if let Some(thread) = std::thread::current().name() {
            record = record.key_value("thread", thread);
        }

        let severity = logger.levels().most_severe().name().to_string();
        match logger.log(&severity, record.build()) {
            Ok(report) => {
                for failure in report.failures() {
                    DefaultTrap::default().trap(failure.error());
                }
            }
            Err(err) => DefaultTrap::default().trap(&err),
        }
        for failure in logger.flush().failures() {
            DefaultTrap::default().trap(failure.error());
        }

        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_no_transports_falls_back_to_console() {
        let service = Service::new(json!({ "logger": { "defaultLevel": "warn" } })).unwrap();
        let infos = service.logger().transport_infos();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "console");
        assert_eq!(infos[0].level, "warn");
        assert!(infos[0].enabled);
        assert_eq!(infos[0].metadata["colorize"], true);
        assert_eq!(infos[0].metadata["timestamp"], true);
        assert_eq!(infos[0].metadata["json"], false);
    }

    #[test]
    fn test_kind_default_levels_apply() {
        let temp_dir = TempDir::new().unwrap();
        let service = Service::new(json!({
            "logger": {
                "defaultLevel": "warn",
                "transports": [
                    { "type": "console" },
                    { "type": "file", "filename": temp_dir.path().join("app.log") },
                    { "type": "mongodb", "db": temp_dir.path().join("db") }
                ]
            }
        }))
        .unwrap();

        let levels = service
            .logger()
            .transport_infos()
            .into_iter()
            .map(|info| (info.name, info.level))
            .collect::<Vec<_>>();
        assert_eq!(
            levels,
            vec![
                ("console".to_string(), "trace".to_string()),
                ("file".to_string(), "error".to_string()),
                ("mongodb".to_string(), "warn".to_string()),
            ]
        );
    }

    #[test]
    fn test_custom_scale_falls_back_to_most_verbose() {
        let service = Service::new(json!({
            "logger": {
                "levels": { "alert": 0, "notice": 5 },
                "colors": { "alert": "magenta" },
                "transports": [{ "type": "console" }]
            }
        }))
        .unwrap();

        // neither the environment default nor the console default exists in this scale
        let info = service.logger().transport_info("console").unwrap();
        assert_eq!(info.level, "notice");
        assert_eq!(service.service_info().colors["alert"], "magenta");
    }

    #[test]
    fn test_validation_failure_lists_every_violation() {
        let err = Service::new(json!({
            "logger": {
                "transports": [
                    { "type": "syslog" },
                    { "type": "logstash" }
                ]
            }
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        let violations = err
            .context()
            .filter(|(k, _)| *k == "violation")
            .map(|(_, v)| v.to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            violations,
            vec![
                "logger.transports[0].type: unknown transport type 'syslog', expected one of console, file, dailyRotateFile, logstash, mongodb",
                "logger.transports[1].host: is required",
            ]
        );
    }

    #[test]
    fn test_validated_flag_skips_the_validator() {
        // the level is unknown; only the runtime notices it
        let err = Service::new(json!({
            "validated": true,
            "logger": { "transports": [{ "type": "console", "level": "loud" }] }
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownLevel);
    }

    #[test]
    fn test_service_help_shape() {
        let service = Service::new(json!({
            "logger": {
                "transports": [{ "type": "console", "name": "quiet", "silent": true }]
            }
        }))
        .unwrap();
        let help = service.service_help().unwrap();

        assert_eq!(help["type"], "record");
        assert_eq!(help["title"], "Logdapter information");
        assert_eq!(help["label"]["disabled_transport_names"], "Disabled transports");
        assert_eq!(help["data"]["disabled_transport_names"], json!(["quiet"]));

        let levels: Value =
            serde_json::from_str(help["data"]["logger_levels"].as_str().unwrap()).unwrap();
        assert_eq!(levels, json!({"debug": 4, "error": 0, "info": 3, "trace": 2, "warn": 1}));
    }
}
