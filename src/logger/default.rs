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

use std::sync::Arc;
use std::sync::OnceLock;

use super::Logger;
use crate::config;
use crate::level::Levels;
use crate::service;
use crate::transport::TransportSet;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

static DEFAULT_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Return the process-wide default logger.
///
/// Unless [`set_default_logger`] ran first, the logger is built on first access: one console
/// transport on the default scale, at the level picked from the `LOGDAPTER_ENV` environment
/// variable. It lives until the process exits.
pub fn default_logger() -> &'static Logger {
    DEFAULT_LOGGER.get_or_init(fallback_logger)
}

/// Install `logger` as the process-wide default logger.
///
/// # Errors
///
/// Return the logger back if a default logger was already installed or built.
pub fn set_default_logger(logger: Logger) -> Result<(), Logger> {
    DEFAULT_LOGGER.set(logger)
}

fn fallback_logger() -> Logger {
    let levels = Arc::new(Levels::default());
    let level = config::environment_default_level();
    let entry = service::fallback_console(level);

    match TransportSet::new(levels.clone(), vec![entry]) {
        Ok(transports) => Logger::new(transports),
        Err(err) => {
            DefaultTrap::default().trap(&err);
            Logger::new(TransportSet::empty(levels))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_is_built_once() {
        let first = default_logger();
        let second = default_logger();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.transport_infos().len(), 1);
        assert_eq!(first.transport_infos()[0].name, "console");

        let other = Logger::new(TransportSet::empty(Arc::new(Levels::default())));
        assert!(set_default_logger(other).is_err());
    }
}
