use std::collections::BTreeMap;

use storage_base::{StorageError, StorageResult};
use tracing::{debug, instrument};

use super::client::{StoreHandle, UploadOptions};
use super::local::FileSystemOperations;
use super::object_store::{ListOptions, ObjectStoreOperations};
use super::traits::{OpenOptions, PathOperations, PathStat, ReadWrite};
use crate::path::{Path, Scheme};

/* 📖 # Why a dispatcher instead of methods on Path?

Path stays a plain value: it can be built, compared and joined without any backend
in sight. Storage owns the backends (the local filesystem plus one client per
object store scheme) and picks one per call from the path's variant. Transfers that
span two backends, like copying a local tree into a bucket, live here because
neither backend alone can perform them.
*/

/// Routes each operation to the backend of its path.
///
/// # Examples
///
/// ```
/// use storage_utils::ops::{MemoryStore, PathOperations, Storage, StoreHandle};
/// use storage_utils::{Path, Scheme};
///
/// let store = MemoryStore::new();
/// store.add_object("bucket", "dir/file.txt", b"content".to_vec());
/// let storage = Storage::new().with_client(Scheme::S3, StoreHandle::new(store));
///
/// let dir = Path::new("s3://bucket/dir").unwrap();
/// assert!(storage.isdir(&dir).unwrap());
/// assert_eq!(storage.listdir(&dir).unwrap(), vec![dir / "file.txt"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Storage {
    local: FileSystemOperations,
    object_stores: BTreeMap<Scheme, ObjectStoreOperations>,
}

impl Storage {
    /// A dispatcher with only the local filesystem backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the client used for paths of `scheme`.
    pub fn with_client(mut self, scheme: Scheme, client: StoreHandle) -> Self {
        self.object_stores
            .insert(scheme, ObjectStoreOperations::new(client));
        self
    }

    pub fn local(&self) -> &FileSystemOperations {
        &self.local
    }

    /// Object store backend for an object store path.
    pub fn object_store(&self, path: &Path) -> StorageResult<&ObjectStoreOperations> {
        let Some(scheme) = path.scheme() else {
            return Err(Box::new(StorageError::configuration(format!(
                "'{}' is not an object store path",
                path
            ))));
        };
        self.object_stores.get(&scheme).ok_or_else(|| {
            Box::new(StorageError::configuration(format!(
                "no {} client configured for '{}'",
                scheme, path
            )))
        })
    }

    /// The backend responsible for `path`.
    pub fn operations(&self, path: &Path) -> StorageResult<&dyn PathOperations> {
        if path.is_local() {
            Ok(&self.local)
        } else {
            Ok(self.object_store(path)?)
        }
    }

    pub fn list(&self, path: &Path, options: &ListOptions) -> StorageResult<Vec<Path>> {
        self.object_store(path)?.list(path, options)
    }

    pub fn upload(
        &self,
        dest: &Path,
        sources: &[Path],
        options: &UploadOptions,
    ) -> StorageResult<Vec<Path>> {
        self.object_store(dest)?.upload(dest, sources, options)
    }

    pub fn download(&self, source: &Path, dest: &Path) -> StorageResult<Vec<Path>> {
        self.object_store(source)?.download(source, dest)
    }

    /// Runs `f` inside a local directory; see [`DirectoryScope`](super::DirectoryScope).
    pub fn with_directory<T>(
        &self,
        path: &Path,
        f: impl FnOnce() -> StorageResult<T>,
    ) -> StorageResult<T> {
        self.local.with_directory(path, f)
    }

    /// Copies a single file between any two backends except store to store.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn copy(&self, source: &Path, dest: &Path) -> StorageResult<()> {
        match (source.is_local(), dest.is_local()) {
            (true, true) => {
                self.local.copy_file(source, dest)?;
            }
            (true, false) => {
                debug!("uploading file");
                self.object_store(dest)?
                    .upload_file(source, dest, &UploadOptions::default())?;
            }
            (false, true) => {
                let target = if self.local.isdir(dest)? {
                    dest / source.basename().as_str()
                } else {
                    dest.clone()
                };
                debug!(target = %target, "downloading object");
                self.object_store(source)?.download_object(source, &target)?;
            }
            (false, false) => {
                return Err(Box::new(StorageError::not_implemented(
                    "copy between object stores",
                    source.as_str(),
                )));
            }
        }
        Ok(())
    }

    /// Copies a directory tree between any two backends except store to store.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn copytree(&self, source: &Path, dest: &Path) -> StorageResult<()> {
        match (source.is_local(), dest.is_local()) {
            (true, true) => self.local.copy_tree(source, dest),
            (true, false) => {
                let uploaded =
                    self.upload(dest, std::slice::from_ref(source), &UploadOptions::default())?;
                debug!(count = uploaded.len(), "uploaded tree");
                Ok(())
            }
            (false, true) => {
                let written = self.download(source, dest)?;
                debug!(count = written.len(), "downloaded tree");
                Ok(())
            }
            (false, false) => Err(Box::new(StorageError::not_implemented(
                "copytree between object stores",
                source.as_str(),
            ))),
        }
    }
}

impl PathOperations for Storage {
    fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.exists(path)
    }

    fn isabs(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.isabs(path)
    }

    fn isdir(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.isdir(path)
    }

    fn isfile(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.isfile(path)
    }

    fn islink(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.islink(path)
    }

    fn ismount(&self, path: &Path) -> StorageResult<bool> {
        self.operations(path)?.ismount(path)
    }

    fn listdir(&self, path: &Path) -> StorageResult<Vec<Path>> {
        self.operations(path)?.listdir(path)
    }

    fn glob(&self, path: &Path, pattern: &str) -> StorageResult<Vec<Path>> {
        self.operations(path)?.glob(path, pattern)
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        self.operations(path)?.remove(path)
    }

    fn rmtree(&self, path: &Path) -> StorageResult<()> {
        self.operations(path)?.rmtree(path)
    }

    fn open(&self, path: &Path, options: &OpenOptions) -> StorageResult<Box<dyn ReadWrite>> {
        self.operations(path)?.open(path, options)
    }

    fn stat(&self, path: &Path) -> StorageResult<PathStat> {
        self.operations(path)?.stat(path)
    }

    fn getsize(&self, path: &Path) -> StorageResult<u64> {
        self.operations(path)?.getsize(path)
    }

    fn walkfiles(&self, path: &Path, pattern: Option<&str>) -> StorageResult<Vec<Path>> {
        self.operations(path)?.walkfiles(path, pattern)
    }
}
