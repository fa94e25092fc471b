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

use std::fmt::Write;

use jiff::tz::TimeZone;
use serde_json::Value;

use crate::Error;
use crate::layout::Layout;
use crate::level::Severity;
use crate::record::Record;

/// A layout that formats log record as text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 error billing: payment rejected order=42
/// 2024-08-11T22:44:57.172219+08:00  warn billing: retrying
/// 2024-08-11T22:44:57.172276+08:00 trace billing: hello
/// ```
///
/// When colorized, the level name is painted with the color the severity scale assigns to it.
/// Colors need the `colored` feature; without it the flag has no effect.
///
/// # Examples
///
/// ```
/// use logdapter::layout::TextLayout;
///
/// let text_layout = TextLayout::default().colorize(false).timestamp(false);
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    colorize: bool,
    timestamp: bool,
    tz: Option<TimeZone>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            colorize: false,
            timestamp: true,
            tz: None,
        }
    }
}

impl TextLayout {
    /// Paint level names with their scale color. Default to `false`.
    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// Prefix every line with the record time. Default to `true`.
    pub fn timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the timezone for timestamps. Default to the system timezone.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    fn level(&self, severity: Severity<'_>) -> String {
        let padded = format!("{:>5}", severity.name());
        if self.colorize {
            paint(padded, severity.color())
        } else {
            padded
        }
    }
}

#[cfg(feature = "colored")]
fn paint(text: String, color: Option<&str>) -> String {
    use colored::Color;
    use colored::Colorize;

    match color.and_then(|c| c.parse::<Color>().ok()) {
        Some(color) => text.as_str().color(color).to_string(),
        None => text,
    }
}

#[cfg(not(feature = "colored"))]
fn paint(text: String, _: Option<&str>) -> String {
    text
}

impl Layout for TextLayout {
    fn format(&self, severity: Severity<'_>, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();

        // SAFETY: write to a string always succeeds
        if self.timestamp {
            let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
            let time = record.time().to_zoned(tz);
            write!(&mut text, "{} ", time.strftime("%Y-%m-%dT%H:%M:%S.%6f%:z")).unwrap();
        }

        write!(&mut text, "{}", self.level(severity)).unwrap();
        if !record.target().is_empty() {
            write!(&mut text, " {}:", record.target()).unwrap();
        }
        write!(&mut text, " {}", record.message()).unwrap();

        for (key, value) in record.key_values() {
            match value {
                Value::String(s) => write!(&mut text, " {key}={s}").unwrap(),
                other => write!(&mut text, " {key}={other}").unwrap(),
            }
        }

        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::level::Levels;

    fn render(layout: &TextLayout, level: &str, record: &Record) -> String {
        let levels = Levels::default();
        let bytes = layout.format(levels.get(level).unwrap(), record).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_plain_line() {
        let layout = TextLayout::default().timestamp(false);
        let record = Record::builder()
            .target("billing")
            .message("payment rejected")
            .key_value("order", 42)
            .key_value("user", "bob")
            .build();

        assert_snapshot!(render(&layout, "error", &record), @"error billing: payment rejected order=42 user=bob");
    }

    #[test]
    fn test_line_without_target() {
        let layout = TextLayout::default().timestamp(false);
        let record = Record::new("cache warmed");
        assert_snapshot!(render(&layout, "debug", &record), @"debug cache warmed");
    }

    #[test]
    fn test_timestamp_uses_timezone() {
        let time = "2024-08-10T17:12:52Z".parse().unwrap();
        let layout = TextLayout::default().timezone(TimeZone::UTC);
        let record = Record::builder().time(time).message("tick").build();
        assert_snapshot!(render(&layout, "trace", &record), @"2024-08-10T17:12:52.000000+00:00 trace tick");
    }
}
