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
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::ErrorKind;
use crate::level::Severity;
use crate::record::Record;
use crate::sink::Sink;

/// The collection name used when none is configured.
pub const DEFAULT_COLLECTION: &str = "log";

/// A destination accepting one JSON document per record.
pub trait Collection: fmt::Debug + Send + Sync + 'static {
    /// Insert one document.
    fn insert(&self, document: Map<String, Value>) -> Result<(), Error>;

    /// Flush pending inserts.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Collection> From<T> for Box<dyn Collection> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A collection stored as `<db>/<collection>.jsonl`, one document per line.
#[derive(Debug)]
pub struct DirectoryCollection {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl DirectoryCollection {
    /// Open the collection, creating the database directory when missing.
    ///
    /// # Errors
    ///
    /// Return an error if the directory cannot be created or the file cannot be opened.
    pub fn open(db: impl AsRef<Path>, collection: &str) -> Result<DirectoryCollection, Error> {
        let db = db.as_ref();
        if collection.is_empty() {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "collection name must not be empty",
            ));
        }

        fs::create_dir_all(db).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to create document store directory")
                .with_context("db", db.display())
                .with_source(err)
        })?;

        let path = db.join(format!("{collection}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to open collection")
                    .with_context("path", path.display())
                    .with_source(err)
            })?;

        Ok(DirectoryCollection {
            path,
            file: Mutex::new(file),
        })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Collection for DirectoryCollection {
    fn insert(&self, document: Map<String, Value>) -> Result<(), Error> {
        let mut line = serde_json::to_vec(&document).map_err(Error::from_json_error)?;
        line.push(b'\n');
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(&line).map_err(Error::from_io_error)
    }

    fn flush(&self) -> Result<(), Error> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.flush().map_err(Error::from_io_error)
    }
}

/// A builder to configure and create a [`DocumentStore`] sink.
#[derive(Debug)]
pub struct DocumentStoreBuilder {
    collection: Box<dyn Collection>,
    name: String,
    db: Option<String>,
    collection_name: Option<String>,
    label: Option<String>,
    store_host: bool,
}

impl DocumentStoreBuilder {
    /// Create a new builder inserting into `collection`.
    pub fn new(collection: impl Into<Box<dyn Collection>>) -> Self {
        Self {
            collection: collection.into(),
            name: "mongodb".to_string(),
            db: None,
            collection_name: None,
            label: None,
            store_host: false,
        }
    }

    /// Set the transport name. Default to `mongodb`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Describe where the collection lives. Only reported through metadata.
    pub fn location(mut self, db: impl Into<String>, collection: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self.collection_name = Some(collection.into());
        self
    }

    /// Add a `label` field to every document.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a `hostname` field to every document. Default to `false`.
    pub fn store_host(mut self, store_host: bool) -> Self {
        self.store_host = store_host;
        self
    }

    /// Build the [`DocumentStore`] sink.
    pub fn build(self) -> DocumentStore {
        let hostname = self.store_host.then(hostname);
        DocumentStore {
            collection: self.collection,
            name: self.name,
            db: self.db,
            collection_name: self.collection_name,
            label: self.label,
            hostname,
        }
    }
}

/// A sink inserting one document per record into a [`Collection`].
#[derive(Debug)]
pub struct DocumentStore {
    collection: Box<dyn Collection>,
    name: String,
    db: Option<String>,
    collection_name: Option<String>,
    label: Option<String>,
    hostname: Option<String>,
}

impl DocumentStore {
    fn document(&self, severity: Severity<'_>, record: &Record) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert("timestamp".into(), record.time().to_string().into());
        document.insert("level".into(), severity.name().into());
        document.insert("message".into(), record.message().into());
        document.insert("meta".into(), Value::Object(record.key_values().clone()));
        if !record.target().is_empty() {
            document.insert("target".into(), record.target().into());
        }
        if let Some(hostname) = &self.hostname {
            document.insert("hostname".into(), hostname.as_str().into());
        }
        if let Some(label) = &self.label {
            document.insert("label".into(), label.as_str().into());
        }
        document
    }
}

impl Sink for DocumentStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity<'_>, record: &Record) -> Result<(), Error> {
        self.collection.insert(self.document(severity, record))
    }

    fn flush(&self) -> Result<(), Error> {
        self.collection.flush()
    }

    fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("type".into(), "mongodb".into());
        if let Some(db) = &self.db {
            metadata.insert("db".into(), db.as_str().into());
        }
        if let Some(collection) = &self.collection_name {
            metadata.insert("collection".into(), collection.as_str().into());
        }
        metadata.insert("storeHost".into(), self.hostname.is_some().into());
        if let Some(label) = &self.label {
            metadata.insert("label".into(), label.as_str().into());
        }
        metadata
    }
}

fn hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
