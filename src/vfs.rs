#![forbid(unsafe_code)]

//! Zip archives exposed as read-only buckets. Member paths are object keys;
//! directories are emulated from the `/` separators in member names.

use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::StoreError;
use crate::model::{Entry, ObjectDetail};

pub fn is_archive_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".zip")
}

fn open_archive(zip_path: &Path) -> Result<ZipArchive<fs::File>, StoreError> {
    let file = fs::File::open(zip_path)?;
    Ok(ZipArchive::new(file)?)
}

pub fn list_archive(zip_path: &Path, prefix: &str) -> Result<Vec<Entry>, StoreError> {
    let mut archive = open_archive(zip_path)?;
    let mut dirs = BTreeSet::new();
    let mut objects = Vec::new();
    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        let name = file.name().to_string();
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        match rest.find('/') {
            Some(idx) => {
                dirs.insert(format!("{}{}", prefix, &rest[..=idx]));
            }
            None => objects.push(Entry::object(name.clone(), file.size(), None)),
        }
    }
    objects.sort_by(|a, b| a.name.cmp(&b.name));
    let mut entries: Vec<Entry> = dirs.into_iter().map(Entry::directory).collect();
    entries.extend(objects);
    Ok(entries)
}

pub fn read_archive_object(zip_path: &Path, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
    let mut archive = open_archive(zip_path)?;
    let mut member = match archive.by_name(key) {
        Ok(member) if member.is_file() => member,
        Ok(_) | Err(ZipError::FileNotFound) => {
            return Err(StoreError::NoSuchKey { bucket: bucket.to_string(), key: key.to_string() });
        }
        Err(err) => return Err(err.into()),
    };
    let mut data = Vec::new();
    member.read_to_end(&mut data)?;
    Ok(data)
}

pub fn stat_archive_object(zip_path: &Path, bucket: &str, key: &str) -> Result<ObjectDetail, StoreError> {
    let data = read_archive_object(zip_path, bucket, key)?;
    Ok(ObjectDetail {
        key: key.to_string(),
        last_modified: None,
        size: data.len() as u64,
        etag: format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&data)),
        acl: "r--r--r--".to_string(),
    })
}
