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

//! Output destinations for log records.
//!
//! A [`Sink`] knows nothing about thresholds or activation: the transport set decides whether
//! a record reaches it. Built-in sinks cover the console, plain files, date-rotated files, a
//! TCP log collector and a document store; anything else can implement the trait.

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::level::Severity;
use crate::record::Record;

pub mod collector;
mod console;
pub mod document;
mod file;
pub mod rotating_file;
mod testing;

pub use self::collector::NetworkCollector;
pub use self::collector::NetworkCollectorBuilder;
pub use self::console::Console;
pub use self::document::Collection;
pub use self::document::DirectoryCollection;
pub use self::document::DocumentStore;
pub use self::document::DocumentStoreBuilder;
pub use self::file::File;
pub use self::file::FileBuilder;
pub use self::rotating_file::RotatingFile;
pub use self::rotating_file::RotatingFileBuilder;
pub use self::testing::Testing;

/// A named output destination that can accept log records.
pub trait Sink: fmt::Debug + Send + Sync + 'static {
    /// The identity the sink registers under unless the caller overrides it.
    fn name(&self) -> &str;

    /// Emit a record at the given severity.
    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error>;

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Descriptive flags shown by introspection surfaces.
    ///
    /// The transport set captures this once at registration and never interprets it.
    fn metadata(&self) -> Map<String, Value> {
        Map::new()
    }
}
