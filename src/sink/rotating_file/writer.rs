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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::SystemTime;

use super::clock::Clock;
use super::pattern::DatePattern;
use crate::Error;
use crate::ErrorKind;
use crate::trap::Trap;

/// A writer that appends to `<filename><date>` and moves on when the date suffix changes.
///
/// With a size limit, a full file continues in `<filename><date>.1`, `<filename><date>.2`, ...
/// With a file limit, the oldest files this writer could have produced are removed after each
/// switch. Other files in the directory are left alone, even when they share the prefix.
#[derive(Debug)]
pub(super) struct DateRotatingWriter {
    state: State,
    writer: File,
}

#[derive(Debug)]
struct State {
    dir: PathBuf,
    prefix: String,
    pattern: DatePattern,
    current_suffix: String,
    current_index: usize,
    current_size: usize,
    max_size: Option<NonZeroUsize>,
    max_files: Option<NonZeroUsize>,
    clock: Clock,
    trap: Box<dyn Trap>,
}

impl DateRotatingWriter {
    pub(super) fn open(
        filename: PathBuf,
        pattern: DatePattern,
        max_size: Option<NonZeroUsize>,
        max_files: Option<NonZeroUsize>,
        clock: Clock,
        trap: Box<dyn Trap>,
    ) -> Result<DateRotatingWriter, Error> {
        let prefix = match filename.file_name().and_then(|name| name.to_str()) {
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => {
                return Err(Error::new(
                    ErrorKind::Unexpected,
                    "log filename must be a non-empty UTF-8 name",
                )
                .with_context("filename", filename.display()));
            }
        };
        let dir = match filename.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to create log directory")
                .with_context("dir", dir.display())
                .with_source(err)
        })?;

        let current_suffix = pattern.render(&clock.now())?;
        let mut state = State {
            dir,
            prefix,
            pattern,
            current_suffix,
            current_index: 0,
            current_size: 0,
            max_size,
            max_files,
            clock,
            trap,
        };

        let writer = state.open_current()?;
        Ok(DateRotatingWriter { state, writer })
    }

    pub(super) fn current_path(&self) -> PathBuf {
        self.state.current_path()
    }

    #[cfg(test)]
    pub(super) fn set_now(&mut self, now: jiff::Zoned) {
        self.state.clock.set_now(now);
    }
}

impl State {
    fn current_path(&self) -> PathBuf {
        let mut name = format!("{}{}", self.prefix, self.current_suffix);
        if self.current_index > 0 {
            name = format!("{name}.{}", self.current_index);
        }
        self.dir.join(name)
    }

    fn is_full(&self) -> bool {
        self.max_size
            .is_some_and(|n| self.current_size >= n.get())
    }

    // Open the file for the current suffix, skipping past parts that are already full.
    fn open_current(&mut self) -> Result<File, Error> {
        loop {
            let path = self.current_path();
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| {
                    Error::new(ErrorKind::Unexpected, "failed to open log file")
                        .with_context("path", path.display())
                        .with_source(err)
                })?;
            self.current_size = file.metadata().map(|m| m.len() as usize).unwrap_or(0);
            if !self.is_full() {
                return Ok(file);
            }
            self.current_index += 1;
        }
    }

    fn switch(&mut self, writer: &mut File) {
        if let Err(err) = writer.flush() {
            let err = Error::new(ErrorKind::Unexpected, "failed to flush previous log file")
                .with_source(err);
            self.trap.trap(&err);
        }

        match self.open_current() {
            Ok(file) => *writer = file,
            Err(err) => self.trap.trap(&err),
        }

        if let Some(max_files) = self.max_files {
            if let Err(err) = self.delete_oldest_logs(max_files.get()) {
                self.trap.trap(&err);
            }
        }
    }

    // `<prefix><rendered pattern>` with an optional `.N` part index
    fn is_own_log(&self, name: &str) -> bool {
        let Some(suffix) = name.strip_prefix(&self.prefix) else {
            return false;
        };
        if self.pattern.matches(suffix) {
            return true;
        }
        match suffix.rsplit_once('.') {
            Some((date, index)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
                self.pattern.matches(date)
            }
            _ => false,
        }
    }

    fn delete_oldest_logs(&self, max_files: usize) -> Result<(), Error> {
        let read_dir = fs::read_dir(&self.dir).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to read log dir")
                .with_context("dir", self.dir.display())
                .with_source(err)
        })?;

        let mut files = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let name = entry.file_name().to_str()?.to_string();
                if !self.is_own_log(&name) {
                    return None;
                }
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, name, entry.path()))
            })
            .collect::<Vec<_>>();

        if files.len() <= max_files {
            return Ok(());
        }

        // oldest first
        files.sort();
        let current = self.current_path();
        let excess = files.len() - max_files;
        for (_, _, path) in files.iter().filter(|(_, _, path)| *path != current).take(excess) {
            fs::remove_file(path).map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to remove old log")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;
        }

        Ok(())
    }
}

impl Write for DateRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let now = self.state.clock.now();
        let suffix = self
            .state
            .pattern
            .render(&now)
            .map_err(|err| io::Error::other(err.to_string()))?;

        if suffix != self.state.current_suffix {
            self.state.current_suffix = suffix;
            self.state.current_index = 0;
            self.state.switch(&mut self.writer);
        } else if self.state.is_full() {
            self.state.current_index += 1;
            self.state.switch(&mut self.writer);
        }

        self.writer
            .write(buf)
            .inspect(|&n| self.state.current_size += n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use jiff::Span;
    use jiff::Zoned;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;
    use crate::sink::rotating_file::clock::ManualClock;
    use crate::trap::DefaultTrap;

    fn writer(
        temp_dir: &TempDir,
        pattern: &str,
        max_size: Option<usize>,
        max_files: Option<usize>,
        start: &Zoned,
    ) -> DateRotatingWriter {
        DateRotatingWriter::open(
            temp_dir.path().join("app.log"),
            DatePattern::parse(pattern).unwrap(),
            max_size.and_then(NonZeroUsize::new),
            max_files.and_then(NonZeroUsize::new),
            Clock::ManualClock(ManualClock::new(start.clone())),
            Box::new(DefaultTrap::default()),
        )
        .unwrap()
    }

    fn generate_random_string() -> String {
        let mut rng = rand::rng();
        let len = rng.random_range(50..=100);
        std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect()
    }

    fn file_names(temp_dir: &TempDir) -> Vec<String> {
        let mut names = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn test_file_name_follows_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let start = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = writer(&temp_dir, ".yyyy-MM-dd", None, None, &start);

        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(
            writer.current_path(),
            temp_dir.path().join("app.log.2024-08-10")
        );
        assert_eq!(file_names(&temp_dir), vec!["app.log.2024-08-10"]);
    }

    #[test]
    fn test_switches_file_when_date_changes() {
        let temp_dir = TempDir::new().unwrap();
        let start = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = writer(&temp_dir, ".yyyy-MM-dd", None, None, &start);

        let mut now = start;
        for _ in 0..3 {
            writer.set_now(now.clone());
            writer.write_all(b"line\n").unwrap();
            now = &now + Span::new().hours(12);
        }
        writer.flush().unwrap();

        assert_eq!(
            file_names(&temp_dir),
            vec!["app.log.2024-08-10", "app.log.2024-08-11"]
        );
        let first = fs::read_to_string(temp_dir.path().join("app.log.2024-08-10")).unwrap();
        assert_eq!(first, "line\nline\n");
    }

    #[test]
    fn test_size_limit_splits_a_period() {
        let temp_dir = TempDir::new().unwrap();
        let start = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = writer(&temp_dir, ".yyyy-MM-dd", Some(1000), None, &start);

        let mut written = 0;
        while written < 3500 {
            let line = generate_random_string();
            written += line.len();
            writer.write_all(line.as_bytes()).unwrap();
        }
        writer.flush().unwrap();

        let names = file_names(&temp_dir);
        assert_eq!(names.len(), 4);
        assert_eq!(names[0], "app.log.2024-08-10");
        assert_eq!(names[3], "app.log.2024-08-10.3");
    }

    #[test]
    fn test_max_files_removes_the_oldest() {
        let temp_dir = TempDir::new().unwrap();
        let start = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = writer(&temp_dir, ".yyyy-MM-dd", None, Some(3), &start);

        let mut now = start;
        for _ in 0..6 {
            writer.set_now(now.clone());
            writer.write_all(generate_random_string().as_bytes()).unwrap();
            now = &now + Span::new().days(1);
        }
        writer.flush().unwrap();

        assert_eq!(
            file_names(&temp_dir),
            vec![
                "app.log.2024-08-13",
                "app.log.2024-08-14",
                "app.log.2024-08-15"
            ]
        );
    }

    #[test]
    fn test_max_files_spares_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("server.toml"), "port = 80\n").unwrap();
        fs::write(temp_dir.path().join("server-notes.log"), "todo\n").unwrap();

        let start = Zoned::from_str("2024-08-10T00:00:00[UTC]").unwrap();
        let mut writer = DateRotatingWriter::open(
            temp_dir.path().join("server"),
            DatePattern::parse("-yyyy-MM-dd.log").unwrap(),
            NonZeroUsize::new(40),
            NonZeroUsize::new(2),
            Clock::ManualClock(ManualClock::new(start.clone())),
            Box::new(DefaultTrap::default()),
        )
        .unwrap();

        let mut now = start;
        for _ in 0..3 {
            writer.set_now(now.clone());
            writer.write_all(generate_random_string().as_bytes()).unwrap();
            writer.write_all(generate_random_string().as_bytes()).unwrap();
            now = &now + Span::new().days(1);
        }
        writer.flush().unwrap();

        assert_eq!(
            file_names(&temp_dir),
            vec![
                "server-2024-08-12.log",
                "server-2024-08-12.log.1",
                "server-notes.log",
                "server.toml",
            ]
        );
    }
}
