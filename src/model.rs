#![forbid(unsafe_code)]

use time::OffsetDateTime;

/// Kind of an item in a remote listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Bucket,
    Directory,
    ParentDirectory,
    Object,
}

impl EntryKind {
    pub fn is_container(self) -> bool {
        !matches!(self, EntryKind::Object)
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Bucket => "bucket",
            EntryKind::Directory => "directory",
            EntryKind::ParentDirectory => "parent directory",
            EntryKind::Object => "object",
        }
    }
}

/// One item of a listing. Entries are never mutated once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Full key, e.g. `logs/2024/` for a directory or `logs/a.txt` for an object.
    pub name: String,
    pub last_modified: Option<OffsetDateTime>,
    /// Byte count, only present on objects.
    pub size: Option<u64>,
}

impl Entry {
    pub fn bucket(name: impl Into<String>) -> Self {
        Self { kind: EntryKind::Bucket, name: name.into(), last_modified: None, size: None }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self { kind: EntryKind::Directory, name: name.into(), last_modified: None, size: None }
    }

    pub fn parent_marker() -> Self {
        Self {
            kind: EntryKind::ParentDirectory,
            name: PARENT_MARKER.to_string(),
            last_modified: None,
            size: None,
        }
    }

    pub fn object(name: impl Into<String>, size: u64, last_modified: Option<OffsetDateTime>) -> Self {
        Self { kind: EntryKind::Object, name: name.into(), last_modified, size: Some(size) }
    }
}

pub const PARENT_MARKER: &str = "../";

/// Last path component of an object key.
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// URI shown to the user for an object.
pub fn object_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Which listing a node shows, derived from its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Buckets,
    BucketRoot,
    Objects,
}

/// Top level state of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    List,
    Menu,
    Detail,
    DownloadHistory,
}

/// Symbolic action produced by the key resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    HalfUp,
    HalfDown,
    Reload,
    Descend,
    Ascend,
    Download,
    Open,
    Edit,
    OpenMenu,
    OpenDetail,
    OpenDownloadHistory,
    ExecuteMenuItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Download,
    Open,
    Edit,
    Detail,
}

impl MenuCommand {
    pub fn label(self) -> &'static str {
        match self {
            MenuCommand::Download => "download",
            MenuCommand::Open => "open",
            MenuCommand::Edit => "edit",
            MenuCommand::Detail => "detail",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MenuItem {
    pub name: &'static str,
    pub shorthand: &'static str,
    pub detail: &'static str,
    pub command: MenuCommand,
}

/// Metadata returned by the store for a single object.
#[derive(Debug, Clone)]
pub struct ObjectDetail {
    pub key: String,
    pub last_modified: Option<OffsetDateTime>,
    pub size: u64,
    pub etag: String,
    pub acl: String,
}
