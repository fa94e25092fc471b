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

use jiff::Zoned;
use jiff::fmt::strtime;

use crate::Error;
use crate::ErrorKind;

// longest tokens first so `yyyy` wins over `yy`
const TOKENS: [(&str, &str); 7] = [
    ("yyyy", "%Y"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
];

/// A file name suffix derived from the current time.
///
/// Patterns use `yyyy yy MM dd HH mm ss`; every other character is copied verbatim, so
/// `.yyyy-MM-dd` renders as `.2024-08-10`. A rotating file switches to a new file whenever the
/// rendered suffix changes, which makes the finest token in the pattern the rotation period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DatePattern {
    pattern: String,
    strftime: String,
}

impl DatePattern {
    pub(super) fn parse(pattern: &str) -> Result<DatePattern, Error> {
        if pattern.is_empty() {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "date pattern must not be empty",
            ));
        }

        let mut strftime = String::with_capacity(pattern.len() * 2);
        let mut rest = pattern;
        'outer: while !rest.is_empty() {
            for (token, spec) in TOKENS {
                if let Some(tail) = rest.strip_prefix(token) {
                    strftime.push_str(spec);
                    rest = tail;
                    continue 'outer;
                }
            }

            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                if c == '%' {
                    strftime.push_str("%%");
                } else {
                    strftime.push(c);
                }
            }
            rest = chars.as_str();
        }

        Ok(DatePattern {
            pattern: pattern.to_string(),
            strftime,
        })
    }

    pub(super) fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether `suffix` is something [`DatePattern::render`] could have produced.
    pub(super) fn matches(&self, suffix: &str) -> bool {
        strtime::parse(&self.strftime, suffix).is_ok()
    }

    pub(super) fn render(&self, now: &Zoned) -> Result<String, Error> {
        strtime::format(&self.strftime, now).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to render date pattern")
                .with_context("pattern", &self.pattern)
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_render_tokens() {
        let now = Zoned::from_str("2024-08-10T17:12:52[UTC]").unwrap();

        let pattern = DatePattern::parse(".yyyy-MM-dd").unwrap();
        assert_eq!(pattern.render(&now).unwrap(), ".2024-08-10");

        let pattern = DatePattern::parse("yyyy-MM-ddTHH").unwrap();
        assert_eq!(pattern.render(&now).unwrap(), "2024-08-10T17");

        let pattern = DatePattern::parse("-yy.MM.dd_HH-mm-ss").unwrap();
        assert_eq!(pattern.render(&now).unwrap(), "-24.08.10_17-12-52");
    }

    #[test]
    fn test_literal_percent_is_escaped() {
        let now = Zoned::from_str("2024-08-10T17:12:52[UTC]").unwrap();
        let pattern = DatePattern::parse("%dd").unwrap();
        assert_eq!(pattern.render(&now).unwrap(), "%10");
    }

    #[test]
    fn test_matches_rendered_suffixes_only() {
        let pattern = DatePattern::parse("-yyyy-MM-dd.log").unwrap();
        assert!(pattern.matches("-2024-08-10.log"));
        assert!(!pattern.matches(".toml"));
        assert!(!pattern.matches("-2024-08-10.log.bak"));
        assert!(!pattern.matches("-notes.log"));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(DatePattern::parse("").is_err());
    }
}
