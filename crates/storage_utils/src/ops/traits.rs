use std::fmt;
use std::fs;
use std::io::{Read, Write};

use storage_base::{StorageError, StorageResult};

use super::client::{ObjectMetadata, UploadOptions};
use crate::path::Path;

/// Stream returned by [`PathOperations::open`].
///
/// Object store writers upload their buffer when flushed or dropped, so the
/// stream is released on every exit path of the caller's scope.
pub trait ReadWrite: Read + Write {}
impl<T: Read + Write> ReadWrite for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Read,
    Write,
    Append,
}

/// Options for [`PathOperations::open`].
///
/// `upload_options` only apply to object store writes; the local backend
/// accepts and ignores them so callers can use one signature for every path.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub mode: OpenMode,
    pub upload_options: UploadOptions,
}

impl OpenOptions {
    pub fn read() -> Self {
        Self::default()
    }

    pub fn write() -> Self {
        Self {
            mode: OpenMode::Write,
            ..Self::default()
        }
    }

    pub fn append() -> Self {
        Self {
            mode: OpenMode::Append,
            ..Self::default()
        }
    }

    pub fn with_upload_options(mut self, upload_options: UploadOptions) -> Self {
        self.upload_options = upload_options;
        self
    }
}

/// Backend-native metadata returned by [`PathOperations::stat`].
#[derive(Debug, Clone)]
pub enum PathStat {
    Local(fs::Metadata),
    Object(ObjectMetadata),
}

impl PathStat {
    pub fn size(&self) -> u64 {
        match self {
            PathStat::Local(metadata) => metadata.len(),
            PathStat::Object(metadata) => metadata.size,
        }
    }
}

/* 📖 # Why is every operation required, even the ones a backend cannot do?

Callers hold a `&dyn PathOperations` and must never branch on the backend. A
missing method would be a compile error, so each backend spells out every
operation. Where an operation has no meaning (globbing with several wildcards on an
object store, changing directory into a bucket), the backend returns a
NotImplemented error rather than guessing.
*/

/// Operations every storage backend implements with the same semantics.
pub trait PathOperations: fmt::Debug + Send + Sync {
    /// True if the path is a file, or a directory with at least one entry.
    fn exists(&self, path: &Path) -> StorageResult<bool>;

    fn isabs(&self, path: &Path) -> StorageResult<bool>;

    fn isdir(&self, path: &Path) -> StorageResult<bool>;

    fn isfile(&self, path: &Path) -> StorageResult<bool>;

    fn islink(&self, path: &Path) -> StorageResult<bool>;

    fn ismount(&self, path: &Path) -> StorageResult<bool>;

    /// Immediate children of a directory. Order is not specified.
    fn listdir(&self, path: &Path) -> StorageResult<Vec<Path>>;

    /// Paths matching `path / pattern`.
    fn glob(&self, path: &Path, pattern: &str) -> StorageResult<Vec<Path>>;

    /// Deletes exactly one file or object; NotFound if it is absent.
    fn remove(&self, path: &Path) -> StorageResult<()>;

    /// Deletes a whole tree; succeeds if nothing is there.
    fn rmtree(&self, path: &Path) -> StorageResult<()>;

    fn open(&self, path: &Path, options: &OpenOptions) -> StorageResult<Box<dyn ReadWrite>>;

    fn stat(&self, path: &Path) -> StorageResult<PathStat>;

    /// Size in bytes; NotFound if the path does not exist.
    fn getsize(&self, path: &Path) -> StorageResult<u64>;

    /// Every file below `path`, optionally filtered by a glob on the file name.
    fn walkfiles(&self, path: &Path, pattern: Option<&str>) -> StorageResult<Vec<Path>>;

    /// Reads the whole content of a file.
    fn read_bytes(&self, path: &Path) -> StorageResult<Vec<u8>> {
        let mut reader = self.open(path, &OpenOptions::read())?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| Box::new(StorageError::from_io(path.as_str(), e)))?;
        Ok(contents)
    }

    /// Reads the whole content of a file as UTF-8.
    fn read_to_string(&self, path: &Path) -> StorageResult<String> {
        let contents = self.read_bytes(path)?;
        String::from_utf8(contents)
            .map_err(|_e| storage_base::err!("File is not valid UTF-8: {}", path))
    }

    /// Replaces the content of a file.
    fn write_bytes(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut writer = self.open(path, &OpenOptions::write())?;
        writer
            .write_all(data)
            .and_then(|()| writer.flush())
            .map_err(|e| Box::new(StorageError::from_io(path.as_str(), e)))
    }
}
