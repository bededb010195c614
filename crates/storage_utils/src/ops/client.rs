use std::collections::BTreeMap;
use std::sync::Arc;

use storage_base::StorageResult;

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Options passed along with every upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// One listing request against a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix are listed.
    pub prefix: String,
    /// When set, keys containing the delimiter after the prefix are rolled
    /// up into a single [`ListEntry::Prefix`].
    pub delimiter: Option<char>,
    pub limit: Option<usize>,
}

impl ListRequest {
    pub fn recursive(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn delimited(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: Some('/'),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Object(ObjectMetadata),
    /// A common prefix, including the trailing delimiter.
    Prefix(String),
}

/// The object store SDK seen from this crate.
///
/// Buckets are named by S3 bucket, or by `tenant/container` for Swift. Methods
/// report a missing bucket or object as a NotFound error, except `head_object`
/// which answers `None`.
pub trait ObjectStoreClient: std::fmt::Debug + Send + Sync + 'static {
    fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Lists keys in ascending order.
    fn list_objects(&self, bucket: &str, request: &ListRequest) -> StorageResult<Vec<ListEntry>>;

    fn head_object(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectMetadata>>;

    fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<()>;

    fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// Shared handle to an object store client.
#[derive(Debug, Clone)]
pub struct StoreHandle(Arc<dyn ObjectStoreClient>);

impl StoreHandle {
    pub fn new(client: impl ObjectStoreClient) -> Self {
        Self(Arc::new(client))
    }
}

impl std::ops::Deref for StoreHandle {
    type Target = dyn ObjectStoreClient;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
