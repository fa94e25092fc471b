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

//! A logging facade that routes records to a set of transports.
//!
//! Every transport pairs a [`Sink`] with a severity threshold and an enabled flag. Both can
//! be changed while the program runs: raise one transport to `debug` for a while, switch
//! another off, then [reset](Logger::reset_default_levels) everything to the configured
//! levels.
//!
//! # Examples
//!
//! Build a logger from configuration:
//!
//! ```
//! use logdapter::Service;
//! use serde_json::json;
//!
//! let service = Service::new(json!({
//!     "logger": {
//!         "transports": [{ "type": "console", "level": "warn" }]
//!     }
//! }))
//! .unwrap();
//!
//! let logger = service.logger();
//! logger.warn("disk almost full").unwrap();
//! assert!(!logger.is_level_enabled("info").unwrap());
//! ```
//!
//! Or assemble the transports by hand:
//!
//! ```
//! use std::sync::Arc;
//!
//! use logdapter::Logger;
//! use logdapter::level::Levels;
//! use logdapter::sink::Console;
//! use logdapter::transport::TransportEntry;
//! use logdapter::transport::TransportSet;
//!
//! let transports = TransportSet::new(
//!     Arc::new(Levels::default()),
//!     vec![TransportEntry::new(Console::default().timestamp(true), "trace")],
//! )
//! .unwrap();
//! let logger = Logger::new(transports);
//! logger.error("connection refused").unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod layout;
pub mod level;
pub mod non_blocking;
pub mod record;
pub mod service;
pub mod sink;
pub mod transport;
pub mod trap;

mod error;
mod logger;

pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::level::Levels;
pub use self::level::Severity;
pub use self::logger::Logger;
pub use self::logger::default_logger;
pub use self::logger::set_default_logger;
pub use self::record::Record;
pub use self::service::Service;
pub use self::sink::Sink;
pub use self::transport::TransportSet;
