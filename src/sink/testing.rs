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

use crate::Error;
use crate::layout::Layout;
use crate::layout::TextLayout;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;

/// A sink that writes log records that can be captured by a test harness (like `cargo test`),
/// and thus the outputs are suppressed unless `--nocapture` or `--show-output` is specified.
///
/// # Examples
///
/// ```
/// use logdapter::sink::Testing;
///
/// let test_sink = Testing::default();
/// ```
#[derive(Debug)]
pub struct Testing {
    name: String,
    layout: Box<dyn Layout>,
}

impl Default for Testing {
    fn default() -> Self {
        Self {
            name: "testing".to_string(),
            layout: Box::new(TextLayout::default()),
        }
    }
}

impl Testing {
    /// Set the transport name. Default to `testing`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the layout. Default to [`TextLayout`].
    pub fn with_layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }
}

impl Sink for Testing {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error> {
        let bytes = self.layout.format(severity, record)?;
        eprintln!("{}", String::from_utf8_lossy(&bytes));
        Ok(())
    }
}
