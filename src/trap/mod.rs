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

//! Traps for errors that cannot be returned to a caller.
//!
//! Background writers, rotation housekeeping and the `log` crate bridge have nobody to return
//! an error to. They hand it to a [`Trap`] instead of logging it through the logger that just
//! failed.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;

use crate::Error;

/// A trap for handling errors.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Handle an error.
    fn trap(&self, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Trap + ?Sized> Trap for Arc<T> {
    fn trap(&self, err: &Error) {
        (**self).trap(err);
    }
}

/// The trap used unless one is configured: one line per error on stderr, tagged with the
/// error kind. Nothing happens if stderr is gone.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl DefaultTrap {
    fn render(err: &Error) -> String {
        format!("logdapter [{}]: {err}", err.kind())
    }
}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = writeln!(io::stderr().lock(), "{}", DefaultTrap::render(err));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use log::Log;

    use super::*;
    use crate::ErrorKind;
    use crate::Logger;
    use crate::level::Levels;
    use crate::level::Severity;
    use crate::record::Record;
    use crate::sink::Sink;
    use crate::transport::TransportEntry;
    use crate::transport::TransportSet;

    #[derive(Debug, Default)]
    struct Collect(Mutex<Vec<String>>);

    impl Trap for Collect {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Sink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&self, _: Severity<'_>, _: &Record) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Unexpected, "disk full"))
        }
    }

    #[test]
    fn test_render_names_the_kind() {
        let err = Error::new(ErrorKind::SinkWrite, "logging worker has stopped");
        assert_eq!(
            DefaultTrap::render(&err),
            "logdapter [SinkWrite]: logging worker has stopped (SinkWrite)"
        );
    }

    #[test]
    fn test_bridge_failures_reach_the_trap() {
        let collect = Arc::new(Collect::default());
        let transports = TransportSet::new(
            Arc::new(Levels::default()),
            vec![TransportEntry::new(Broken, "debug")],
        )
        .unwrap();
        let logger = Logger::new(transports).with_trap(collect.clone());

        Log::log(
            &logger,
            &log::Record::builder()
                .level(log::Level::Error)
                .args(format_args!("lost"))
                .build(),
        );

        let trapped = collect.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].starts_with("sink failed to write record (SinkWrite)"));
        assert!(trapped[0].contains("transport: broken"));
    }
}
