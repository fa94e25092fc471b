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
use std::thread;

use logdapter::Service;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_uncaught_panics_are_logged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("crash.log");

    let _service = Service::new(json!({
        "logger": {
            "exceptionCaught": true,
            "transports": [{ "type": "file", "filename": path, "timestamp": false }]
        }
    }))
    .unwrap();

    let result = thread::Builder::new()
        .name("worker".to_string())
        .spawn(|| panic!("boom"))
        .unwrap()
        .join();
    assert!(result.is_err());

    let content = fs::read_to_string(&path).unwrap();
    let line = content.lines().next().unwrap();
    assert!(line.starts_with("error panic: boom"), "{line}");
    assert!(line.contains("location=tests/panic_hook.rs:"), "{line}");
    assert!(line.ends_with("thread=worker"), "{line}");
}
