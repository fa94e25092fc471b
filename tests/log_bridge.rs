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
use std::sync::Arc;

use logdapter::Error;
use logdapter::Levels;
use logdapter::Logger;
use logdapter::Record;
use logdapter::Severity;
use logdapter::layout::Layout;
use logdapter::sink::FileBuilder;
use logdapter::transport::TransportEntry;
use logdapter::transport::TransportSet;
use tempfile::TempDir;

#[derive(Debug)]
struct CustomLayout(&'static str);

impl Layout for CustomLayout {
    fn format(&self, severity: Severity<'_>, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = format!("{} [{}] {}", self.0, severity, record.message());
        for (key, value) in record.key_values() {
            text.push_str(&format!(" {key}={value}"));
        }
        Ok(text.into_bytes())
    }
}

// the global logger can be installed once per process, so everything runs in one test
#[test]
fn test_log_macros_reach_transports() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bridge.log");
    let file = FileBuilder::new(&path)
        .layout(CustomLayout("file"))
        .build()
        .unwrap();
    let transports = TransportSet::new(
        Arc::new(Levels::default()),
        vec![TransportEntry::new(file, "debug")],
    )
    .unwrap();
    let logger = Logger::new(transports);
    logger.clone().apply();

    struct Thing<'a>(&'a str);

    impl std::fmt::Display for Thing<'_> {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            log::debug!("formatting wrapping ({})", self.0);
            f.write_str(self.0)
        }
    }

    // logging while a message is formatted must not deadlock
    log::info!("I'm logging {}!", Thing("aha"));
    log::warn!(order = 42, retry = true; "payment rejected");

    // lowering the threshold is seen by the installed logger
    logger.set_level("warn", "file");
    log::info!("dropped");
    assert!(!log::log_enabled!(log::Level::Info));
    assert!(log::log_enabled!(log::Level::Error));

    logger.flush();
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content.lines().collect::<Vec<_>>(),
        vec![
            "file [debug] formatting wrapping (aha)",
            "file [info] I'm logging aha!",
            "file [warn] payment rejected order=42 retry=true",
        ]
    );
}
