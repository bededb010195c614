use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use storage_base::{StorageError, StorageResult};
use tracing::{debug, instrument};

use super::client::{
    ListEntry, ListRequest, ObjectMetadata, ObjectStoreClient, UploadOptions,
};

/* 📖 # Why ship an in-memory object store?

The object store backend only talks to an `ObjectStoreClient`. MemoryStore implements
that trait over nested BTreeMaps, which gives:
1. **Deterministic tests**: listings come back in key order, with no network involved
2. **Isolation**: every test builds its own buckets
3. **Sharing**: clones point at the same state, so a test can seed data through one
   handle and observe it through the backend

It models the parts of S3/Swift the backend relies on (buckets, flat keys, delimiter
listings) and nothing else.
*/

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    options: UploadOptions,
}

type Buckets = BTreeMap<String, BTreeMap<String, StoredObject>>;

/// In-memory [`ObjectStoreClient`].
///
/// # Examples
///
/// ```
/// use storage_utils::ops::{MemoryStore, ObjectStoreClient};
///
/// let store = MemoryStore::new();
/// store.create_bucket("bucket");
/// store.add_object("bucket", "dir/file.txt", b"content".to_vec());
/// assert_eq!(store.get_object("bucket", "dir/file.txt").unwrap(), b"content");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<Mutex<Buckets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.lock().entry(bucket.to_string()).or_default();
    }

    /// Stores an object, creating the bucket if needed.
    pub fn add_object(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data,
                    options: UploadOptions::default(),
                },
            );
    }

    /// All keys of a bucket in ascending order; empty if the bucket is missing.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn missing_bucket(bucket: &str) -> Box<StorageError> {
        Box::new(StorageError::not_found(bucket))
    }
}

fn metadata_of(key: &str, object: &StoredObject) -> ObjectMetadata {
    ObjectMetadata {
        key: key.to_string(),
        size: object.data.len() as u64,
        content_type: object.options.content_type.clone(),
        metadata: object.options.metadata.clone(),
    }
}

impl ObjectStoreClient for MemoryStore {
    fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        Ok(self.buckets.lock().contains_key(bucket))
    }

    #[instrument(skip(self), fields(prefix = %request.prefix))]
    fn list_objects(&self, bucket: &str, request: &ListRequest) -> StorageResult<Vec<ListEntry>> {
        let buckets = self.buckets.lock();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Self::missing_bucket(bucket))?;
        let limit = request.limit.unwrap_or(usize::MAX);
        let mut entries = Vec::new();
        let mut seen_prefixes = BTreeSet::new();
        for (key, object) in objects.range(request.prefix.clone()..) {
            if entries.len() >= limit {
                break;
            }
            let Some(rest) = key.strip_prefix(request.prefix.as_str()) else {
                break;
            };
            let rolled_up = request
                .delimiter
                .and_then(|delimiter| rest.find(delimiter).map(|i| (i, delimiter)));
            match rolled_up {
                Some((index, delimiter)) => {
                    let prefix = format!("{}{}", request.prefix, &rest[..index + delimiter.len_utf8()]);
                    if seen_prefixes.insert(prefix.clone()) {
                        entries.push(ListEntry::Prefix(prefix));
                    }
                }
                None => entries.push(ListEntry::Object(metadata_of(key, object))),
            }
        }
        debug!(count = entries.len(), "listed objects");
        Ok(entries)
    }

    fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        let buckets = self.buckets.lock();
        Ok(buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| metadata_of(key, object)))
    }

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let buckets = self.buckets.lock();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Self::missing_bucket(bucket))?;
        objects
            .get(key)
            .map(|object| object.data.clone())
            .ok_or_else(|| Box::new(StorageError::not_found(format!("{}/{}", bucket, key))))
    }

    #[instrument(skip(self, data, options), fields(size = data.len()))]
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()> {
        let mut buckets = self.buckets.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::missing_bucket(bucket))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                options: options.clone(),
            },
        );
        debug!("stored object");
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.lock();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::missing_bucket(bucket))?;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Box::new(StorageError::not_found(format!("{}/{}", bucket, key))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_object("b", "a.txt", b"a".to_vec());
        store.add_object("b", "dir/", Vec::new());
        store.add_object("b", "dir/x", b"xx".to_vec());
        store.add_object("b", "dir/sub/y", b"y".to_vec());
        store.add_object("b", "dirty", b"z".to_vec());
        store
    }

    fn describe(entries: &[ListEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                ListEntry::Object(metadata) => metadata.key.clone(),
                ListEntry::Prefix(prefix) => format!("prefix {}", prefix),
            })
            .collect()
    }

    #[test]
    fn test_recursive_listing() {
        let entries = seeded().list_objects("b", &ListRequest::recursive("dir")).unwrap();
        assert_eq!(describe(&entries), ["dir/", "dir/sub/y", "dir/x", "dirty"]);
    }

    #[test]
    fn test_delimited_listing() {
        let store = seeded();
        let entries = store.list_objects("b", &ListRequest::delimited("dir/")).unwrap();
        assert_eq!(describe(&entries), ["dir/", "prefix dir/sub/", "dir/x"]);
        let root = store.list_objects("b", &ListRequest::delimited("")).unwrap();
        assert_eq!(describe(&root), ["a.txt", "prefix dir/", "dirty"]);
    }

    #[test]
    fn test_listing_limit() {
        let entries = seeded()
            .list_objects("b", &ListRequest::recursive("").with_limit(2))
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_missing_bucket_is_not_found() {
        let store = MemoryStore::new();
        let error = store.list_objects("nope", &ListRequest::default()).unwrap_err();
        assert!(error.is_not_found());
        assert!(!store.bucket_exists("nope").unwrap());
        assert!(store.head_object("nope", "k").unwrap().is_none());
        assert!(store.put_object("nope", "k", Vec::new(), &UploadOptions::default()).is_err());
    }

    #[test]
    fn test_put_keeps_upload_options() {
        let store = MemoryStore::new();
        store.create_bucket("b");
        let options = UploadOptions {
            content_type: Some("text/plain".to_string()),
            ..UploadOptions::default()
        };
        store.put_object("b", "k", b"abc".to_vec(), &options).unwrap();
        let metadata = store.head_object("b", "k").unwrap().unwrap();
        assert_eq!(metadata.size, 3);
        assert_eq!(metadata.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_delete() {
        let store = seeded();
        store.delete_object("b", "a.txt").unwrap();
        assert!(store.delete_object("b", "a.txt").unwrap_err().is_not_found());
        assert!(!store.keys("b").contains(&"a.txt".to_string()));
    }
}
