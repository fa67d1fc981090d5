//! Key/value payloads carried by package nodes, including file blobs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::common::EntryId;

/// In-memory file selected by the author, not yet uploaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl FileValue {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for FileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileValue")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Value side of a package key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    Text(String),
    /// Plain strings, e.g. reference names of files uploaded earlier.
    List(Vec<String>),
    File(FileValue),
    Files(Vec<FileValue>),
}

impl KvValue {
    pub fn text(value: impl Into<String>) -> Self {
        KvValue::Text(value.into())
    }

    /// Short human-readable summary of the value.
    pub fn summary(&self) -> String {
        match self {
            KvValue::Text(text) => text.clone(),
            KvValue::List(items) => format!("[{}]", items.join(", ")),
            KvValue::File(file) => format!("<file {}>", file.name),
            KvValue::Files(files) => {
                let names: Vec<&str> = files.iter().map(|file| file.name.as_str()).collect();
                format!("<files {}>", names.join(", "))
            }
        }
    }
}

impl Default for KvValue {
    fn default() -> Self {
        KvValue::Text(String::new())
    }
}

/// One positional entry in a package's key/value mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub id: EntryId,
    pub key: String,
    pub value: KvValue,
}

impl KeyValueEntry {
    pub fn new(key: impl Into<String>, value: KvValue) -> Self {
        Self {
            id: EntryId::new(),
            key: key.into(),
            value,
        }
    }
}
