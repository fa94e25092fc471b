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

//! Declarative service configuration.
//!
//! ```
//! use logdapter::config::ServiceConfig;
//! use logdapter::config::TransportKind;
//!
//! let config: ServiceConfig = serde_json::from_value(serde_json::json!({
//!     "logger": {
//!         "transports": [
//!             { "type": "console", "level": "debug", "json": true },
//!             { "type": "logstash", "host": "127.0.0.1", "enabled": false }
//!         ]
//!     }
//! }))
//! .unwrap();
//!
//! let transports = &config.logger.transports;
//! assert!(matches!(transports[0].kind, TransportKind::Console(_)));
//! assert_eq!(transports[1].common.enabled, Some(false));
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

mod validate;

pub use self::validate::Validation;
pub use self::validate::Violation;
pub use self::validate::validate;

/// The environment variable consulted for the service default level.
pub const ENV_VAR: &str = "LOGDAPTER_ENV";

/// The default level picked from [`ENV_VAR`].
///
/// Unset or `production` gives `error`; any other value gives `trace`.
pub fn environment_default_level() -> &'static str {
    default_level_for(std::env::var(ENV_VAR).ok().as_deref())
}

fn default_level_for(env: Option<&str>) -> &'static str {
    match env {
        None | Some("production") => "error",
        Some(_) => "trace",
    }
}

/// The root of a service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Skip the validator when `true`.
    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// A custom severity scale; the default scale when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<BTreeMap<String, i64>>,
    /// Colors laid over the scale's colors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_level: Option<String>,
    /// Report panics to the transports.
    #[serde(default)]
    pub exception_caught: bool,
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
}

/// One transport definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub kind: TransportKind,
}

impl TransportConfig {
    /// The configured name, or the kind's default name.
    pub fn name(&self) -> &str {
        self.common
            .name
            .as_deref()
            .unwrap_or_else(|| self.kind.type_name())
    }

    /// Whether the transport starts disabled.
    pub fn starts_disabled(&self) -> bool {
        self.common.enabled == Some(false) || self.common.silent == Some(true)
    }
}

/// Fields shared by every transport kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
}

/// The closed set of transport kinds, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportKind {
    #[serde(rename = "console")]
    Console(ConsoleConfig),
    #[serde(rename = "file")]
    File(FileConfig),
    #[serde(rename = "dailyRotateFile")]
    RotatingFile(RotatingFileConfig),
    #[serde(rename = "logstash")]
    NetworkCollector(NetworkCollectorConfig),
    #[serde(rename = "mongodb")]
    DocumentStore(DocumentStoreConfig),
}

impl TransportKind {
    /// Every `type` tag, in declaration order.
    pub const TYPE_NAMES: [&'static str; 5] =
        ["console", "file", "dailyRotateFile", "logstash", "mongodb"];

    /// The `type` tag, which is also the default transport name.
    pub fn type_name(&self) -> &'static str {
        match self {
            TransportKind::Console(_) => "console",
            TransportKind::File(_) => "file",
            TransportKind::RotatingFile(_) => "dailyRotateFile",
            TransportKind::NetworkCollector(_) => "logstash",
            TransportKind::DocumentStore(_) => "mongodb",
        }
    }

    /// The level a transport of this kind gets when none is configured.
    ///
    /// `None` defers to the service default level.
    pub fn default_level(&self) -> Option<&'static str> {
        match self {
            TransportKind::Console(_) | TransportKind::RotatingFile(_) => Some("trace"),
            TransportKind::File(_) => Some("error"),
            TransportKind::NetworkCollector(_) | TransportKind::DocumentStore(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub colorize: bool,
    #[serde(default)]
    pub timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub filename: PathBuf,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_true")]
    pub timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatingFileConfig {
    pub filename: PathBuf,
    pub date_pattern: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_true")]
    pub timestamp: bool,
    #[serde(default, rename = "maxsize", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCollectorConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default = "default_max_connect_retries")]
    pub max_connect_retries: usize,
    /// Milliseconds between two connection attempts.
    #[serde(default = "default_timeout_connect_retries")]
    pub timeout_connect_retries: u64,
    /// Milliseconds to drop events after every connection attempt failed.
    #[serde(default = "default_reconnect_cooldown")]
    pub reconnect_cooldown: u64,
    /// Events waiting for the background worker before writes are rejected.
    #[serde(default = "default_buffered_lines_limit")]
    pub buffered_lines_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStoreConfig {
    /// The directory holding the collections.
    pub db: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub store_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    crate::sink::collector::DEFAULT_PORT
}

fn default_max_connect_retries() -> usize {
    4
}

fn default_timeout_connect_retries() -> u64 {
    100
}

fn default_reconnect_cooldown() -> u64 {
    1000
}

fn default_buffered_lines_limit() -> usize {
    crate::sink::collector::DEFAULT_BUFFERED_LINES_LIMIT
}

fn default_collection() -> String {
    crate::sink::document::DEFAULT_COLLECTION.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_default_level_from_environment() {
        assert_eq!(default_level_for(None), "error");
        assert_eq!(default_level_for(Some("production")), "error");
        assert_eq!(default_level_for(Some("development")), "trace");
        assert_eq!(default_level_for(Some("")), "trace");
    }

    #[test]
    fn test_type_specific_defaults() {
        let config: TransportConfig = serde_json::from_value(json!({
            "type": "logstash",
            "host": "127.0.0.1"
        }))
        .unwrap();
        assert_eq!(config.name(), "logstash");
        let TransportKind::NetworkCollector(collector) = config.kind else {
            panic!("expected a collector");
        };
        assert_eq!(collector.port, 28777);
        assert_eq!(collector.max_connect_retries, 4);
        assert_eq!(collector.timeout_connect_retries, 100);
        assert_eq!(collector.reconnect_cooldown, 1000);
        assert_eq!(collector.buffered_lines_limit, 1024);

        let config: TransportConfig = serde_json::from_value(json!({
            "type": "dailyRotateFile",
            "name": "rotate",
            "filename": "dailyfile.log",
            "datePattern": ".yyyy-MM-dd",
            "maxFiles": 3,
            "silent": true
        }))
        .unwrap();
        assert_eq!(config.name(), "rotate");
        assert!(config.starts_disabled());
        let TransportKind::RotatingFile(rotating) = config.kind else {
            panic!("expected a rotating file");
        };
        assert!(!rotating.json);
        assert!(rotating.timestamp);
        assert_eq!(rotating.max_files, Some(3));
        assert_eq!(rotating.max_size, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_value::<TransportConfig>(json!({ "type": "syslog" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_default_levels() {
        let kinds = [
            TransportKind::Console(ConsoleConfig::default()),
            TransportKind::File(FileConfig {
                filename: "app.log".into(),
                json: false,
                timestamp: true,
            }),
        ];
        assert_eq!(kinds[0].default_level(), Some("trace"));
        assert_eq!(kinds[1].default_level(), Some("error"));
        assert_eq!(TransportKind::TYPE_NAMES[2], "dailyRotateFile");
    }
}
