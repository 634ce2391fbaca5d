#![forbid(unsafe_code)]

//! Object store collaborator: the four listing/transfer calls the browser
//! needs, plus object metadata for the detail view.

use std::io::{Cursor, Read};
use std::path::PathBuf;

use crate::error::StoreError;
use crate::fs_ops;
use crate::model::{Entry, ObjectDetail};
use crate::vfs;

pub trait ObjectStore {
    /// Every bucket, as `Bucket` entries.
    fn list_roots(&self) -> Result<Vec<Entry>, StoreError>;

    /// One delimiter level below `prefix` in `bucket`: common prefixes as
    /// `Directory` entries followed by `Object` entries.
    fn list_children(&self, bucket: &str, prefix: &str) -> Result<Vec<Entry>, StoreError>;

    fn fetch_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + '_>, StoreError>;

    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read) -> Result<(), StoreError>;

    fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectDetail, StoreError>;
}

/// Directory backed store. Each sub-directory of `root` is a bucket and each
/// `*.zip` file is a read-only bucket holding the archive members.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

enum Bucket {
    Dir(PathBuf),
    Archive(PathBuf),
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket(&self, name: &str) -> Result<Bucket, StoreError> {
        if name.is_empty() || name.starts_with('.') || name.contains('/') {
            return Err(StoreError::InvalidKey(name.to_string()));
        }
        let path = self.root.join(name);
        if path.is_dir() {
            Ok(Bucket::Dir(path))
        } else if path.is_file() && vfs::is_archive_name(name) {
            Ok(Bucket::Archive(path))
        } else {
            Err(StoreError::NoSuchBucket(name.to_string()))
        }
    }
}

impl ObjectStore for LocalStore {
    fn list_roots(&self) -> Result<Vec<Entry>, StoreError> {
        tracing::info!(root = %self.root.display(), "list buckets");
        Ok(fs_ops::list_buckets(&self.root)?)
    }

    fn list_children(&self, bucket: &str, prefix: &str) -> Result<Vec<Entry>, StoreError> {
        fs_ops::validate_key(prefix)?;
        tracing::info!(bucket, prefix, "list objects");
        match self.bucket(bucket)? {
            Bucket::Dir(dir) => Ok(fs_ops::list_prefix(&dir, prefix)?),
            Bucket::Archive(zip) => vfs::list_archive(&zip, prefix),
        }
    }

    fn fetch_object(&self, bucket: &str, key: &str) -> Result<Box<dyn Read + '_>, StoreError> {
        fs_ops::validate_key(key)?;
        tracing::info!(bucket, key, "get object");
        match self.bucket(bucket)? {
            Bucket::Dir(dir) => Ok(Box::new(fs_ops::open_object(&dir, bucket, key)?)),
            Bucket::Archive(zip) => {
                let data = vfs::read_archive_object(&zip, bucket, key)?;
                Ok(Box::new(Cursor::new(data)))
            }
        }
    }

    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read) -> Result<(), StoreError> {
        fs_ops::validate_key(key)?;
        if key.is_empty() || key.ends_with('/') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        tracing::info!(bucket, key, "put object");
        match self.bucket(bucket)? {
            Bucket::Dir(dir) => fs_ops::write_object(&dir, key, body),
            Bucket::Archive(_) => Err(StoreError::ReadOnly(bucket.to_string())),
        }
    }

    fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectDetail, StoreError> {
        fs_ops::validate_key(key)?;
        match self.bucket(bucket)? {
            Bucket::Dir(dir) => fs_ops::stat_object(&dir, bucket, key),
            Bucket::Archive(zip) => vfs::stat_archive_object(&zip, bucket, key),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Read;

    use super::*;
    use crate::model::EntryKind;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("photos/2024")).unwrap();
        fs::write(dir.path().join("photos/index.html"), "<html>").unwrap();
        fs::write(dir.path().join("photos/2024/cat.jpg"), "meow").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a bucket").unwrap();
        dir
    }

    #[test]
    fn buckets_are_directories() {
        let dir = fixture();
        let store = LocalStore::new(dir.path());
        let names: Vec<_> = store.list_roots().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["empty", "photos"]);
    }

    #[test]
    fn lists_one_level_with_delimiter() {
        let dir = fixture();
        let store = LocalStore::new(dir.path());
        let entries = store.list_children("photos", "").unwrap();
        let listed: Vec<_> = entries.iter().map(|e| (e.kind, e.name.as_str())).collect();
        assert_eq!(
            listed,
            vec![(EntryKind::Directory, "2024/"), (EntryKind::Object, "index.html")]
        );
        assert_eq!(entries[1].size, Some(6));
        assert!(entries[1].last_modified.is_some());

        let nested = store.list_children("photos", "2024/").unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "2024/cat.jpg");

        assert!(store.list_children("photos", "nowhere/").unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_buckets_and_traversal() {
        let dir = fixture();
        let store = LocalStore::new(dir.path());
        assert!(matches!(store.list_children("nope", ""), Err(StoreError::NoSuchBucket(_))));
        assert!(matches!(store.list_children("notes.txt", ""), Err(StoreError::NoSuchBucket(_))));
        assert!(matches!(store.list_children("photos", "../"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.fetch_object("..", "x"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn fetch_and_put_round_trip_through_disk() {
        let dir = fixture();
        let store = LocalStore::new(dir.path());
        let mut body = String::new();
        store
            .fetch_object("photos", "2024/cat.jpg")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "meow");

        store
            .put_object("photos", "2025/dog.jpg", &mut "woof".as_bytes())
            .unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("photos/2025/dog.jpg")).unwrap(), "woof");

        assert!(matches!(
            store.fetch_object("photos", "missing.jpg"),
            Err(StoreError::NoSuchKey { .. })
        ));
    }

    #[test]
    fn stat_reports_size_etag_and_acl() {
        let dir = fixture();
        let store = LocalStore::new(dir.path());
        let detail = store.stat_object("photos", "index.html").unwrap();
        assert_eq!(detail.key, "index.html");
        assert_eq!(detail.size, 6);
        assert_eq!(detail.etag, format!("{:016x}", xxhash_rust::xxh3::xxh3_64(b"<html>")));
        assert_eq!(detail.acl.len(), 9);
    }
}
