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

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::TransportKind;
use crate::level::DEFAULT_LEVELS;

/// One reason a configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Where the offending value sits, e.g. `logger.transports[1].host`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub violations: Vec<Violation>,
}

impl Validation {
    /// Whether the configuration was accepted.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    fn reject(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }
}

#[derive(Clone, Copy)]
enum FieldType {
    Bool,
    // non-empty
    String,
    // at least the given value
    UInt(u64),
    Port,
}

struct Field {
    name: &'static str,
    ty: FieldType,
    required: bool,
}

const fn field(name: &'static str, ty: FieldType, required: bool) -> Field {
    Field { name, ty, required }
}

const CONSOLE_FIELDS: &[Field] = &[
    field("json", FieldType::Bool, false),
    field("colorize", FieldType::Bool, false),
    field("timestamp", FieldType::Bool, false),
];

const FILE_FIELDS: &[Field] = &[
    field("filename", FieldType::String, true),
    field("json", FieldType::Bool, false),
    field("colorize", FieldType::Bool, false),
    field("timestamp", FieldType::Bool, false),
];

const ROTATING_FILE_FIELDS: &[Field] = &[
    field("filename", FieldType::String, true),
    field("datePattern", FieldType::String, true),
    field("json", FieldType::Bool, false),
    field("colorize", FieldType::Bool, false),
    field("timestamp", FieldType::Bool, false),
    field("maxsize", FieldType::UInt(1), false),
    field("maxFiles", FieldType::UInt(1), false),
];

const COLLECTOR_FIELDS: &[Field] = &[
    field("host", FieldType::String, true),
    field("port", FieldType::Port, false),
    field("node_name", FieldType::String, false),
    field("max_connect_retries", FieldType::UInt(0), false),
    field("timeout_connect_retries", FieldType::UInt(0), false),
    field("reconnect_cooldown", FieldType::UInt(0), false),
    field("buffered_lines_limit", FieldType::UInt(1), false),
];

const DOCUMENT_STORE_FIELDS: &[Field] = &[
    field("db", FieldType::String, true),
    field("collection", FieldType::String, false),
    field("storeHost", FieldType::Bool, false),
    field("label", FieldType::String, false),
];

fn fields_of(type_name: &str) -> Option<&'static [Field]> {
    match type_name {
        "console" => Some(CONSOLE_FIELDS),
        "file" => Some(FILE_FIELDS),
        "dailyRotateFile" => Some(ROTATING_FILE_FIELDS),
        "logstash" => Some(COLLECTOR_FIELDS),
        "mongodb" => Some(DOCUMENT_STORE_FIELDS),
        _ => None,
    }
}

/// Check a service configuration before any transport is built.
///
/// Every violation is collected; validation never stops at the first one. Unknown fields are
/// allowed.
///
/// ```
/// use logdapter::config::validate;
/// use serde_json::json;
///
/// let validation = validate(&json!({
///     "logger": { "transports": [{ "type": "file" }] }
/// }));
/// assert!(!validation.is_ok());
/// assert_eq!(validation.violations[0].path, "logger.transports[0].filename");
/// ```
pub fn validate(config: &Value) -> Validation {
    let mut validation = Validation::default();

    let Some(root) = config.as_object() else {
        validation.reject("$", "must be an object");
        return validation;
    };

    if let Some(validated) = root.get("validated") {
        if !validated.is_boolean() {
            validation.reject("validated", "must be a boolean");
        }
    }

    let Some(logger) = root.get("logger") else {
        return validation;
    };
    let Some(logger) = logger.as_object() else {
        validation.reject("logger", "must be an object");
        return validation;
    };

    let levels = check_scale(logger, &mut validation);

    if let Some(colors) = logger.get("colors") {
        match colors.as_object() {
            Some(colors) => {
                for (name, color) in colors {
                    if !color.is_string() {
                        validation.reject(format!("logger.colors.{name}"), "must be a string");
                    }
                }
            }
            None => validation.reject("logger.colors", "must be an object"),
        }
    }

    if let Some(level) = logger.get("defaultLevel") {
        check_level("logger.defaultLevel", level, &levels, &mut validation);
    }

    if let Some(caught) = logger.get("exceptionCaught") {
        if !caught.is_boolean() {
            validation.reject("logger.exceptionCaught", "must be a boolean");
        }
    }

    if let Some(transports) = logger.get("transports") {
        match transports.as_array() {
            Some(transports) => check_transports(transports, &levels, &mut validation),
            None => validation.reject("logger.transports", "must be an array"),
        }
    }

    validation
}

// Returns the level names later checks resolve against.
fn check_scale(logger: &Map<String, Value>, validation: &mut Validation) -> Vec<String> {
    let defaults = || -> Vec<String> {
        DEFAULT_LEVELS.iter().map(|(n, _, _)| n.to_string()).collect()
    };

    let Some(levels) = logger.get("levels") else {
        return defaults();
    };
    let Some(levels) = levels.as_object() else {
        validation.reject("logger.levels", "must be an object");
        return defaults();
    };
    if levels.is_empty() {
        validation.reject("logger.levels", "must define at least one level");
        return defaults();
    }

    let mut ranks = HashSet::new();
    for (name, rank) in levels {
        match rank.as_i64() {
            Some(rank) => {
                if !ranks.insert(rank) {
                    validation.reject(format!("logger.levels.{name}"), "duplicate rank");
                }
            }
            None => validation.reject(format!("logger.levels.{name}"), "must be an integer"),
        }
    }
    levels.keys().cloned().collect()
}

fn check_level(path: &str, level: &Value, levels: &[String], validation: &mut Validation) {
    match level.as_str() {
        Some(name) if levels.iter().any(|l| l == name) => {}
        Some(name) => validation.reject(path, format!("unknown level '{name}'")),
        None => validation.reject(path, "must be a string"),
    }
}

fn check_transports(transports: &[Value], levels: &[String], validation: &mut Validation) {
    let mut names = HashSet::new();

    for (i, transport) in transports.iter().enumerate() {
        let path = format!("logger.transports[{i}]");
        let Some(transport) = transport.as_object() else {
            validation.reject(path, "must be an object");
            continue;
        };

        let type_name = match transport.get("type") {
            None => {
                validation.reject(format!("{path}.type"), "is required");
                None
            }
            Some(Value::String(type_name)) => {
                if fields_of(type_name).is_none() {
                    validation.reject(
                        format!("{path}.type"),
                        format!(
                            "unknown transport type '{type_name}', expected one of {}",
                            TransportKind::TYPE_NAMES.join(", ")
                        ),
                    );
                }
                Some(type_name.as_str())
            }
            Some(_) => {
                validation.reject(format!("{path}.type"), "must be a string");
                None
            }
        };

        if let Some(level) = transport.get("level") {
            check_level(&format!("{path}.level"), level, levels, validation);
        }
        for flag in ["enabled", "silent"] {
            if let Some(value) = transport.get(flag) {
                if !value.is_boolean() {
                    validation.reject(format!("{path}.{flag}"), "must be a boolean");
                }
            }
        }

        let name = match transport.get("name") {
            Some(Value::String(name)) => Some(name.as_str()),
            Some(_) => {
                validation.reject(format!("{path}.name"), "must be a string");
                None
            }
            None => type_name,
        };
        if let Some(name) = name {
            if !names.insert(name.to_string()) {
                validation.reject(
                    format!("{path}.name"),
                    format!("duplicate transport name '{name}'"),
                );
            }
        }

        if let Some(fields) = type_name.and_then(fields_of) {
            for field in fields {
                check_field(&path, transport, field, validation);
            }
        }
    }
}

fn check_field(
    path: &str,
    transport: &Map<String, Value>,
    field: &Field,
    validation: &mut Validation,
) {
    let path = format!("{path}.{}", field.name);
    let Some(value) = transport.get(field.name) else {
        if field.required {
            validation.reject(path, "is required");
        }
        return;
    };

    match field.ty {
        FieldType::Bool => {
            if !value.is_boolean() {
                validation.reject(path, "must be a boolean");
            }
        }
        FieldType::String => match value.as_str() {
            Some("") => validation.reject(path, "must not be empty"),
            Some(_) => {}
            None => validation.reject(path, "must be a string"),
        },
        FieldType::UInt(min) => match value.as_u64() {
            Some(n) if n >= min => {}
            Some(_) => validation.reject(path, format!("must be at least {min}")),
            None => validation.reject(path, "must be a non-negative integer"),
        },
        FieldType::Port => match value.as_u64() {
            Some(n) if n <= u64::from(u16::MAX) => {}
            _ => validation.reject(path, "must be a port number"),
        },
    }
}
