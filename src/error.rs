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

use std::fmt;
use std::io;

/// The kind of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A severity name that is not part of the severity scale.
    UnknownLevel,
    /// The severity scale is empty or has duplicate names or ranks.
    InvalidScale,
    /// Two transports were registered under the same name.
    DuplicateTransport,
    /// A sink failed to accept a record.
    SinkWrite,
    /// The configuration was rejected.
    ConfigInvalid,
    /// Anything else, mostly I/O failures.
    Unexpected,
}

impl ErrorKind {
    /// Return the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownLevel => "UnknownLevel",
            ErrorKind::InvalidScale => "InvalidScale",
            ErrorKind::DuplicateTransport => "DuplicateTransport",
            ErrorKind::SinkWrite => "SinkWrite",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::Unexpected => "Unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error struct of logdapter.
pub struct Error {
    kind: ErrorKind,
    message: String,
    sources: Vec<anyhow::Error>,
    context: Vec<(&'static str, String)>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)?;

        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            write!(
                f,
                "{}",
                self.context
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            write!(f, " }}")?;
        }

        if !self.sources.is_empty() {
            write!(f, ", sources: [")?;
            for (i, source) in self.sources.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{source}")?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            let mut de = f.debug_struct("Error");
            de.field("kind", &self.kind);
            de.field("message", &self.message);
            de.field("context", &self.context);
            de.field("sources", &self.sources);
            return de.finish();
        }

        writeln!(f, "{}: {}", self.kind, self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "Context:")?;
            for (k, v) in self.context.iter() {
                writeln!(f, "   {k}: {v}")?;
            }
        }
        if !self.sources.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sources:")?;
            for source in self.sources.iter() {
                writeln!(f, "   {source:#}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.sources.first().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with error kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sources: vec![],
            context: vec![],
        }
    }

    /// Add one more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Add one more source in error.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        self.sources.push(src.into());
        self
    }

    /// Return the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Return the context entries attached to this error, in insertion order.
    pub fn context(&self) -> impl ExactSizeIterator<Item = (&'static str, &str)> {
        self.context.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Return an iterator over all sources of this error.
    pub fn sources(&self) -> impl ExactSizeIterator<Item = &(dyn std::error::Error + 'static)> {
        self.sources.iter().map(|v| v.as_ref())
    }

    pub(crate) fn unknown_level(level: &str) -> Error {
        Error::new(ErrorKind::UnknownLevel, "unknown severity level").with_context("level", level)
    }

    /// Default constructor for [`Error`] from [`io::Error`].
    pub fn from_io_error(err: io::Error) -> Error {
        Error::new(ErrorKind::Unexpected, "failed to perform io").with_source(err)
    }

    /// Default constructor for [`Error`] from [`serde_json::Error`].
    pub fn from_json_error(err: serde_json::Error) -> Error {
        Error::new(ErrorKind::Unexpected, "failed to perform json serialization").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context_and_source() {
        let err = Error::new(ErrorKind::SinkWrite, "failed to write record")
            .with_context("transport", "console")
            .with_source(io::Error::other("broken pipe"));

        assert_eq!(
            err.to_string(),
            "failed to write record (SinkWrite), context: { transport: console }, sources: [broken pipe]"
        );
        assert_eq!(err.kind(), ErrorKind::SinkWrite);
        assert_eq!(err.sources().len(), 1);
    }

    #[test]
    fn test_unknown_level_carries_the_name() {
        let err = Error::unknown_level("verbose");
        assert_eq!(err.kind(), ErrorKind::UnknownLevel);
        let context = err.context().collect::<Vec<_>>();
        assert_eq!(context, vec![("level", "verbose")]);
    }
}
