#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use time::OffsetDateTime;

use crate::error::StoreError;
use crate::model::{Entry, ObjectDetail};
use crate::vfs::is_archive_name;

/// Rejects keys that would escape the bucket directory.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Ok(());
    }
    let invalid = key.starts_with('/')
        || key
            .trim_end_matches('/')
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn modified(metadata: &fs::Metadata) -> Option<OffsetDateTime> {
    metadata.modified().ok().map(OffsetDateTime::from)
}

pub fn list_buckets(root: &Path) -> io::Result<Vec<Entry>> {
    let mut buckets = Vec::new();
    for item in fs::read_dir(root)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let metadata = item.metadata()?;
        if metadata.is_dir() || (metadata.is_file() && is_archive_name(&name)) {
            let mut bucket = Entry::bucket(name);
            bucket.last_modified = modified(&metadata);
            buckets.push(bucket);
        }
    }
    buckets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(buckets)
}

/// Lists one delimiter level of `bucket_dir` below `prefix`. A prefix that
/// does not end in `/` also filters the last level by name, as S3 does.
pub fn list_prefix(bucket_dir: &Path, prefix: &str) -> io::Result<Vec<Entry>> {
    let (dir_part, name_filter) = match prefix.rfind('/') {
        Some(idx) => prefix.split_at(idx + 1),
        None => ("", prefix),
    };
    let dir = bucket_dir.join(dir_part);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    let mut objects = Vec::new();
    for item in fs::read_dir(&dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().to_string();
        if !name.starts_with(name_filter) {
            continue;
        }
        let metadata = item.metadata()?;
        if metadata.is_dir() {
            dirs.push(Entry::directory(format!("{}{}/", dir_part, name)));
        } else if metadata.is_file() {
            objects.push(Entry::object(
                format!("{}{}", dir_part, name),
                metadata.len(),
                modified(&metadata),
            ));
        }
    }
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    objects.sort_by(|a, b| a.name.cmp(&b.name));
    dirs.extend(objects);
    Ok(dirs)
}

pub fn open_object(bucket_dir: &Path, bucket: &str, key: &str) -> Result<fs::File, StoreError> {
    let path = bucket_dir.join(key);
    if key.is_empty() || !path.is_file() {
        return Err(StoreError::NoSuchKey { bucket: bucket.to_string(), key: key.to_string() });
    }
    Ok(fs::File::open(path)?)
}

/// Writes `body` next to the target and renames it into place.
pub fn write_object(bucket_dir: &Path, key: &str, body: &mut dyn Read) -> Result<(), StoreError> {
    let path = bucket_dir.join(key);
    let parent = path.parent().unwrap_or(bucket_dir);
    fs::create_dir_all(parent)?;
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    io::copy(body, &mut staged)?;
    staged.persist(&path).map_err(|err| err.error)?;
    Ok(())
}

pub fn stat_object(bucket_dir: &Path, bucket: &str, key: &str) -> Result<ObjectDetail, StoreError> {
    let mut file = open_object(bucket_dir, bucket, key)?;
    let metadata = file.metadata()?;
    let mut data = Vec::with_capacity(metadata.len() as usize);
    file.read_to_end(&mut data)?;
    Ok(ObjectDetail {
        key: key.to_string(),
        last_modified: modified(&metadata),
        size: metadata.len(),
        etag: format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&data)),
        acl: permission_string(metadata.permissions().mode()),
    })
}

pub fn permission_string(mode: u32) -> String {
    let flags = ['r', 'w', 'x'];
    (0..9)
        .map(|bit| {
            if mode & (0o400 >> bit) != 0 {
                flags[bit % 3]
            } else {
                '-'
            }
        })
        .collect()
}
