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

use std::fs;

use jiff::Zoned;
use jiff::fmt::strtime;
use logdapter::ErrorKind;
use logdapter::Record;
use logdapter::Service;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_service_routes_to_file_sinks() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("errors.log");
    let rotating = temp_dir.path().join("dailyfile.log");
    let db = temp_dir.path().join("logs");

    let service = Service::new(json!({
        "logger": {
            "transports": [
                { "type": "file", "filename": file, "timestamp": false },
                {
                    "type": "dailyRotateFile",
                    "name": "rotate",
                    "filename": rotating,
                    "datePattern": ".yyyy-MM-dd",
                    "json": true,
                    "level": "info"
                },
                { "type": "mongodb", "db": db, "level": "warn", "enabled": false }
            ]
        }
    }))
    .unwrap();
    let logger = service.logger();

    let record = Record::builder()
        .target("billing")
        .message("payment rejected")
        .key_value("order", 42)
        .build();
    logger.error(record).unwrap();
    let report = logger.info("user signed in").unwrap();
    assert_eq!(report.delivered_count(), 1);
    assert!(logger.flush().is_ok());

    let content = fs::read_to_string(&file).unwrap();
    assert_eq!(content, "error billing: payment rejected order=42\n");

    // the suffix may roll over between the write and this read
    let date = strtime::format(".%Y-%m-%d", &Zoned::now()).unwrap();
    let rotated = temp_dir.path().join(format!("dailyfile.log{date}"));
    if rotated.exists() {
        let lines = fs::read_to_string(&rotated)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "error");
        assert_eq!(lines[1]["message"], "user signed in");
    }

    // disabled at definition time, so nothing reaches it
    let documents = fs::read_to_string(db.join("log.jsonl")).unwrap();
    assert!(documents.is_empty());
    assert_eq!(service.service_info().disabled_transports, vec!["mongodb"]);
}

#[test]
fn test_runtime_activation_through_the_service_logger() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("logs");

    let service = Service::new(json!({
        "logger": {
            "transports": [
                { "type": "mongodb", "db": db, "collection": "audit", "label": "api", "enabled": false }
            ]
        }
    }))
    .unwrap();
    let logger = service.logger();

    // the service default level only matters once a transport is enabled
    assert!(!logger.is_level_enabled("error").unwrap());
    logger.activate(Some(true), "mongodb");
    logger.set_level("warn", "mongodb");
    logger.warn("quota exceeded").unwrap();
    logger.reset_default_levels();

    let documents = fs::read_to_string(db.join("audit.jsonl")).unwrap();
    let document: Value = serde_json::from_str(documents.trim_end()).unwrap();
    assert_eq!(document["level"], "warn");
    assert_eq!(document["label"], "api");
    assert_eq!(document["message"], "quota exceeded");
    assert!(service.service_info().disabled_transports.is_empty());

    let info = logger.transport_info("mongodb").unwrap();
    assert_eq!(info.level, info.default_level);
    assert_eq!(info.metadata["collection"], "audit");
}

#[test]
fn test_service_info_serializes_with_original_keys() {
    let service = Service::new(json!({
        "logger": { "transports": [{ "type": "console", "json": true, "level": "debug" }] }
    }))
    .unwrap();

    let info = serde_json::to_value(service.service_info()).unwrap();
    assert_eq!(info["levels"]["trace"], 2);
    assert_eq!(info["colors"]["warn"], "cyan");
    assert_eq!(info["transports"][0]["name"], "console");
    assert_eq!(info["transports"][0]["level"], "debug");
    assert_eq!(info["transports"][0]["defaultLevel"], "debug");
    assert_eq!(info["transports"][0]["metadata"]["json"], true);
    assert_eq!(info["disabledTransports"], json!([]));
}

#[test]
fn test_unusable_sink_fails_construction() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let err = Service::new(json!({
        "logger": {
            "transports": [{ "type": "file", "filename": blocker.join("app.log") }]
        }
    }))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}
