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

use std::io::Write;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::SendTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;

use super::Message;
use super::worker::Worker;
use crate::Error;
use crate::ErrorKind;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

/// A guard that flushes records associated with a [`NonBlocking`] writer on drop.
///
/// Writing to a [`NonBlocking`] writer does **not** immediately reach the underlying output;
/// a dedicated thread writes it later. Dropping the guard asks the worker to drain what is
/// queued and waits for it up to the configured shutdown timeout.
#[derive(Debug)]
pub struct WorkerGuard {
    _handle: JoinHandle<()>,
    sender: Sender<Message>,
    shutdown: Sender<()>,
    shutdown_timeout: Duration,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let shutdown_timeout = self.shutdown_timeout;
        match self
            .sender
            .send_timeout(Message::Shutdown, shutdown_timeout)
        {
            Ok(()) => {
                // The worker acknowledges on a zero-capacity channel once drained.
                let _ = self.shutdown.send_timeout((), shutdown_timeout);
            }
            Err(SendTimeoutError::Disconnected(_)) => (),
            Err(SendTimeoutError::Timeout(_)) => {
                let err = Error::new(
                    ErrorKind::Unexpected,
                    "failed to send shutdown signal to logging worker",
                );
                DefaultTrap::default().trap(&err);
            }
        }
    }
}

/// A handle that queues formatted records for a background writer.
#[derive(Clone, Debug)]
pub struct NonBlocking {
    sender: Sender<Message>,
}

impl NonBlocking {
    /// Queue one formatted record.
    ///
    /// # Errors
    ///
    /// Return an error if the queue is full or the worker is gone.
    pub fn send(&self, record: Vec<u8>) -> Result<(), Error> {
        self.sender
            .try_send(Message::Record(record))
            .map_err(|err| match err {
                TrySendError::Full(_) => {
                    Error::new(ErrorKind::SinkWrite, "logging queue is full, record dropped")
                }
                TrySendError::Disconnected(_) => {
                    Error::new(ErrorKind::SinkWrite, "logging worker has stopped")
                }
            })
    }
}

/// A builder for configuring [`NonBlocking`].
#[derive(Debug)]
pub struct NonBlockingBuilder {
    thread_name: String,
    buffered_lines_limit: Option<usize>,
    shutdown_timeout: Duration,
    trap: Box<dyn Trap>,
}

impl NonBlockingBuilder {
    /// Create a new [`NonBlockingBuilder`] whose worker thread has the given name.
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            buffered_lines_limit: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Bound the number of pending records. Unbounded by default.
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> Self {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// How long dropping the [`WorkerGuard`] waits for the worker. Default to 100ms.
    pub fn shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Set the trap receiving write failures of the worker.
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Spawn the worker over `writer`.
    ///
    /// # Errors
    ///
    /// Return an error if the worker thread cannot be spawned.
    pub fn build<W>(self, writer: W) -> Result<(NonBlocking, WorkerGuard), Error>
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = match self.buffered_lines_limit {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let (shutdown_sender, shutdown_receiver) = bounded(0);

        let worker = Worker::new(writer, receiver, shutdown_receiver, self.trap);
        let handle = worker.spawn(self.thread_name)?;

        let guard = WorkerGuard {
            _handle: handle,
            sender: sender.clone(),
            shutdown: shutdown_sender,
            shutdown_timeout: self.shutdown_timeout,
        };
        Ok((NonBlocking { sender }, guard))
    }
}
