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
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::RecvError;
use crossbeam_channel::TryRecvError;

use super::Message;
use crate::Error;
use crate::ErrorKind;
use crate::trap::Trap;

pub(super) struct Worker<W: Write + Send + 'static> {
    writer: W,
    receiver: Receiver<Message>,
    shutdown: Receiver<()>,
    trap: Box<dyn Trap>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum WorkerState {
    Empty,
    Disconnected,
    Continue,
    Shutdown,
}

impl<W: Write + Send + 'static> Worker<W> {
    pub(super) fn new(
        writer: W,
        receiver: Receiver<Message>,
        shutdown: Receiver<()>,
        trap: Box<dyn Trap>,
    ) -> Worker<W> {
        Self {
            writer,
            receiver,
            shutdown,
            trap,
        }
    }

    fn handle(&mut self, message: Message) -> io::Result<WorkerState> {
        match message {
            Message::Record(record) => {
                self.writer.write_all(&record)?;
                Ok(WorkerState::Continue)
            }
            Message::Shutdown => Ok(WorkerState::Shutdown),
        }
    }

    fn work(&mut self) -> io::Result<WorkerState> {
        let mut state = match self.receiver.recv() {
            Ok(message) => self.handle(message)?,
            Err(RecvError) => WorkerState::Disconnected,
        };

        // drain whatever queued up before flushing once
        while state == WorkerState::Continue {
            state = match self.receiver.try_recv() {
                Ok(message) => self.handle(message)?,
                Err(TryRecvError::Empty) => WorkerState::Empty,
                Err(TryRecvError::Disconnected) => WorkerState::Disconnected,
            };
        }

        self.writer.flush()?;
        Ok(state)
    }

    pub(super) fn spawn(mut self, name: String) -> Result<JoinHandle<()>, Error> {
        std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                loop {
                    match self.work() {
                        Ok(WorkerState::Continue) | Ok(WorkerState::Empty) => {}
                        Ok(WorkerState::Shutdown) | Ok(WorkerState::Disconnected) => {
                            let _ = self.shutdown.recv();
                            break;
                        }
                        Err(err) => {
                            let err = Error::new(ErrorKind::SinkWrite, "failed to write log")
                                .with_source(err);
                            self.trap.trap(&err);
                        }
                    }
                }
                if let Err(err) = self.writer.flush() {
                    let err = Error::new(ErrorKind::SinkWrite, "failed to flush log writer")
                        .with_source(err);
                    self.trap.trap(&err);
                }
            })
            .map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to spawn logging worker").with_source(err)
            })
    }
}
