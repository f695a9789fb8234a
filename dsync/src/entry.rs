use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Directory,
    Regular,
    Symlink,
    /// An entry without byte representation (native documents, devices, sockets...)
    Special,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Directory => f.write_str("directory"),
            EntryKind::Regular => f.write_str("file"),
            EntryKind::Symlink => f.write_str("link"),
            EntryKind::Special => f.write_str("special file"),
        }
    }
}

/// A named node of a storage tree.
///
/// `H` is the handle by which the storage addresses the node:
/// an absolute path for the file system, an opaque id for a drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<H> {
    name: String,
    kind: EntryKind,
    mtime: Option<DateTime<Utc>>,
    size: Option<u64>,
    handle: H,
}

impl<H> Entry<H> {
    pub fn directory(name: impl Into<String>, handle: H, mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            mtime,
            size: None,
            handle,
        }
    }

    pub fn regular(name: impl Into<String>, handle: H, mtime: DateTime<Utc>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Regular,
            mtime: Some(mtime),
            size: Some(size),
            handle,
        }
    }

    pub fn symlink(name: impl Into<String>, handle: H, mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Symlink,
            mtime,
            size: None,
            handle,
        }
    }

    pub fn special(name: impl Into<String>, handle: H, mtime: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Special,
            mtime,
            size: None,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn mtime(&self) -> Option<DateTime<Utc>> {
        self.mtime
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn into_handle(self) -> H {
        self.handle
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::Regular
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }

    pub fn is_special(&self) -> bool {
        self.kind == EntryKind::Special
    }

    /// Neither a directory nor a regular file
    pub fn is_unsupported(&self) -> bool {
        self.is_symlink() || self.is_special()
    }
}
