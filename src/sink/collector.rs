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

use std::io;
use std::io::Write;
use std::net::TcpStream;
use std::num::NonZeroUsize;
use std::time::Duration;
use std::time::Instant;

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::level::Severity;
use crate::non_blocking::NonBlocking;
use crate::non_blocking::NonBlockingBuilder;
use crate::non_blocking::WorkerGuard;
use crate::record::Record;
use crate::sink::Sink;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// The collector port used when none is configured.
pub const DEFAULT_PORT: u16 = 28777;

const DEFAULT_MAX_CONNECT_RETRIES: usize = 4;
const DEFAULT_TIMEOUT_CONNECT_RETRIES: Duration = Duration::from_millis(100);
const DEFAULT_RECONNECT_COOLDOWN: Duration = Duration::from_secs(1);

/// The number of events queued for the worker when no limit is configured.
pub const DEFAULT_BUFFERED_LINES_LIMIT: usize = 1024;

// keys that key-values of a record never replace
const RESERVED_KEYS: [&str; 5] = ["timestamp", "level", "message", "target", "node_name"];

/// A builder to configure and create a [`NetworkCollector`] sink.
#[derive(Debug)]
pub struct NetworkCollectorBuilder {
    host: String,
    port: u16,
    name: String,
    node_name: Option<String>,
    max_connect_retries: usize,
    timeout_connect_retries: Duration,
    reconnect_cooldown: Duration,
    buffered_lines_limit: usize,
    shutdown_timeout: Option<Duration>,
    trap: Box<dyn Trap>,
}

impl NetworkCollectorBuilder {
    /// Create a new builder sending to `host` on the default port.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            name: "logstash".to_string(),
            node_name: None,
            max_connect_retries: DEFAULT_MAX_CONNECT_RETRIES,
            timeout_connect_retries: DEFAULT_TIMEOUT_CONNECT_RETRIES,
            reconnect_cooldown: DEFAULT_RECONNECT_COOLDOWN,
            buffered_lines_limit: DEFAULT_BUFFERED_LINES_LIMIT,
            shutdown_timeout: None,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the collector port. Default to 28777.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the transport name. Default to `logstash`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Tag every event with a `node_name` field.
    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = Some(node_name.into());
        self
    }

    /// How many connection attempts to make before giving up on a record. Default to 4.
    pub fn max_connect_retries(mut self, max_connect_retries: usize) -> Self {
        self.max_connect_retries = max_connect_retries;
        self
    }

    /// The pause between two connection attempts. Default to 100ms.
    pub fn timeout_connect_retries(mut self, timeout: Duration) -> Self {
        self.timeout_connect_retries = timeout;
        self
    }

    /// After all connection attempts failed, drop events without trying again for this long.
    /// Default to 1s.
    pub fn reconnect_cooldown(mut self, cooldown: Duration) -> Self {
        self.reconnect_cooldown = cooldown;
        self
    }

    /// Bound the events waiting for the worker. Once full, [`Sink::write`] fails with
    /// [`SinkWrite`](crate::ErrorKind::SinkWrite). Default to 1024.
    pub fn buffered_lines_limit(mut self, limit: NonZeroUsize) -> Self {
        self.buffered_lines_limit = limit.get();
        self
    }

    /// How long dropping the sink waits for pending events.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Set the trap receiving connection and write failures of the background worker.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`NetworkCollector`] sink.
    ///
    /// No connection is made here. The worker connects on the first event.
    ///
    /// # Errors
    ///
    /// Return an error if the background worker cannot be spawned.
    pub fn build(self) -> Result<NetworkCollector, Error> {
        let NetworkCollectorBuilder {
            host,
            port,
            name,
            node_name,
            max_connect_retries,
            timeout_connect_retries,
            reconnect_cooldown,
            buffered_lines_limit,
            shutdown_timeout,
            trap,
        } = self;

        let connection = Connection::new(
            host.clone(),
            port,
            max_connect_retries,
            timeout_connect_retries,
            reconnect_cooldown,
        );

        let mut builder = NonBlockingBuilder::new(format!("logdapter-{name}"))
            .buffered_lines_limit(Some(buffered_lines_limit))
            .trap(trap);
        if let Some(timeout) = shutdown_timeout {
            builder = builder.shutdown_timeout(timeout);
        }
        let (writer, guard) = builder.build(connection)?;

        Ok(NetworkCollector {
            name,
            host,
            port,
            node_name,
            buffered_lines_limit,
            writer,
            _guard: guard,
        })
    }
}

/// A sink shipping newline-delimited JSON events to a TCP log collector.
#[derive(Debug)]
pub struct NetworkCollector {
    name: String,
    host: String,
    port: u16,
    node_name: Option<String>,
    buffered_lines_limit: usize,
    writer: NonBlocking,
    _guard: WorkerGuard,
}

impl NetworkCollector {
    fn event(&self, severity: Severity<'_>, record: &Record) -> Map<String, Value> {
        let mut event = Map::new();
        event.insert(
            "timestamp".into(),
            format_timestamp(record.time()).into(),
        );
        event.insert("level".into(), severity.name().into());
        event.insert("message".into(), record.message().into());
        if !record.target().is_empty() {
            event.insert("target".into(), record.target().into());
        }
        if let Some(node_name) = &self.node_name {
            event.insert("node_name".into(), node_name.as_str().into());
        }
        for (k, v) in record.key_values() {
            if !RESERVED_KEYS.contains(&k.as_str()) {
                event.insert(k.clone(), v.clone());
            }
        }
        event
    }
}

fn format_timestamp(time: Timestamp) -> String {
    time.strftime("%Y-%m-%dT%H:%M:%S.%3fZ").to_string()
}

impl Sink for NetworkCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error> {
        let event = self.event(severity, record);
        let mut bytes = serde_json::to_vec(&event).map_err(Error::from_json_error)?;
        bytes.push(b'\n');
        self.writer.send(bytes)
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("type".into(), "logstash".into());
        metadata.insert("host".into(), self.host.as_str().into());
        metadata.insert("port".into(), self.port.into());
        metadata.insert(
            "buffered_lines_limit".into(),
            self.buffered_lines_limit.into(),
        );
        if let Some(node_name) = &self.node_name {
            metadata.insert("node_name".into(), node_name.as_str().into());
        }
        metadata
    }
}

// A lazily connected TCP stream owned by the background worker.
#[derive(Debug)]
struct Connection {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    max_connect_retries: usize,
    timeout_connect_retries: Duration,
    reconnect_cooldown: Duration,
    // when the last round of connection attempts gave up
    failed_at: Option<Instant>,
}

impl Connection {
    fn new(
        host: String,
        port: u16,
        max_connect_retries: usize,
        timeout_connect_retries: Duration,
        reconnect_cooldown: Duration,
    ) -> Connection {
        Connection {
            host,
            port,
            stream: None,
            max_connect_retries,
            timeout_connect_retries,
            reconnect_cooldown,
            failed_at: None,
        }
    }

    fn connect(&mut self) -> io::Result<&mut TcpStream> {
        if self.stream.is_none() {
            if let Some(failed_at) = self.failed_at {
                if failed_at.elapsed() < self.reconnect_cooldown {
                    return Err(io::Error::new(
                        io::ErrorKind::NotConnected,
                        "collector unreachable, event dropped",
                    ));
                }
            }

            let attempts = self.max_connect_retries.max(1);
            let mut last_error = None;
            for attempt in 0..attempts {
                if attempt > 0 {
                    std::thread::sleep(self.timeout_connect_retries);
                }
                match TcpStream::connect((self.host.as_str(), self.port)) {
                    Ok(stream) => {
                        self.stream = Some(stream);
                        self.failed_at = None;
                        break;
                    }
                    Err(err) => last_error = Some(err),
                }
            }
            if self.stream.is_none() {
                self.failed_at = Some(Instant::now());
                return Err(last_error.unwrap_or_else(|| {
                    io::Error::new(io::ErrorKind::NotConnected, "no connection attempt made")
                }));
            }
        }

        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))
    }
}

impl Write for Connection {
    // Delivery is at least once: an event cut off by a broken connection is sent again in
    // full on the next one, after a newline that terminates any partial line.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.connect()?.write_all(buf);
        if result.is_err() {
            self.stream = None;
            let stream = self.connect()?;
            stream.write_all(b"\n")?;
            stream.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufRead;
    use std::io::BufReader;
    use std::io::Read;
    use std::net::Shutdown;
    use std::net::TcpListener;

    use super::*;
    use crate::level::Levels;

    #[test]
    fn test_delivers_one_json_line_per_record() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let levels = Levels::default();

        let sink = NetworkCollectorBuilder::new("127.0.0.1")
            .port(port)
            .node_name("node-1")
            .shutdown_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let record = Record::builder()
            .target("billing")
            .message("payment rejected")
            .key_value("order", 42)
            .key_value("level", "shadowed")
            .build();
        sink.write(levels.get("warn").unwrap(), &record).unwrap();
        drop(sink);

        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();

        let event: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(event["level"], "warn");
        assert_eq!(event["message"], "payment rejected");
        assert_eq!(event["target"], "billing");
        assert_eq!(event["node_name"], "node-1");
        assert_eq!(event["order"], 42);
        assert!(event["timestamp"].is_string());
    }

    #[test]
    fn test_metadata_reports_endpoint() {
        let sink = NetworkCollectorBuilder::new("127.0.0.1")
            .max_connect_retries(1)
            .timeout_connect_retries(Duration::from_millis(1))
            .build()
            .unwrap();
        let metadata = sink.metadata();
        assert_eq!(metadata["type"], "logstash");
        assert_eq!(metadata["host"], "127.0.0.1");
        assert_eq!(metadata["port"], 28777);
        assert_eq!(metadata["buffered_lines_limit"], 1024);
        assert!(metadata.get("node_name").is_none());
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_full_queue_rejects_events() {
        let levels = Levels::default();
        // the worker is stuck retrying the first event while the rest queue up
        let sink = NetworkCollectorBuilder::new("127.0.0.1")
            .port(closed_port())
            .max_connect_retries(2)
            .timeout_connect_retries(Duration::from_millis(500))
            .buffered_lines_limit(NonZeroUsize::new(2).unwrap())
            .shutdown_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let errors = (0..5)
            .filter_map(|i| {
                sink.write(levels.get("error").unwrap(), &Record::new(format!("event {i}")))
                    .err()
            })
            .collect::<Vec<_>>();
        assert!(!errors.is_empty());
        assert!(
            errors
                .iter()
                .all(|err| err.kind() == crate::ErrorKind::SinkWrite)
        );
    }

    #[test]
    fn test_unreachable_collector_cools_down() {
        let mut connection = Connection::new(
            "127.0.0.1".to_string(),
            closed_port(),
            3,
            Duration::from_millis(100),
            Duration::from_secs(60),
        );

        let start = Instant::now();
        assert!(connection.write_all(b"{}\n").is_err());
        assert!(start.elapsed() >= Duration::from_millis(200));

        // no new attempts until the cooldown elapses
        let start = Instant::now();
        for _ in 0..10 {
            assert!(connection.write_all(b"{}\n").is_err());
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_resend_starts_on_a_fresh_line() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut connection = Connection::new(
            "127.0.0.1".to_string(),
            port,
            1,
            Duration::from_millis(1),
            Duration::from_secs(1),
        );

        connection.connect().unwrap();
        let (first, _) = listener.accept().unwrap();
        // writes on this stream now fail, forcing a reconnect
        connection
            .stream
            .as_ref()
            .unwrap()
            .shutdown(Shutdown::Write)
            .unwrap();

        connection.write_all(b"{\"message\":\"hi\"}\n").unwrap();
        drop(connection);
        drop(first);

        let (second, _) = listener.accept().unwrap();
        let mut received = String::new();
        BufReader::new(second).read_to_string(&mut received).unwrap();
        assert_eq!(received, "\n{\"message\":\"hi\"}\n");
    }
}
