use std::fs;
use std::io::{self, Cursor, Read, Write};

use storage_base::{ResultExt, StorageError, StorageResult};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::client::{ListEntry, ListRequest, ObjectMetadata, StoreHandle, UploadOptions};
use super::local::compile_glob;
use super::traits::{OpenMode, OpenOptions, PathOperations, PathStat, ReadWrite};
use crate::path::{Path, PathVariant, Scheme};

/* 📖 # How do directories exist on a flat object store?

Object stores only have keys. A "directory" `dir` exists when any key starts with
`dir/`, or when the empty sentinel object `dir/` itself is present (that is how
empty directories survive an upload). Sentinels are never reported as files and are
skipped by listings.
*/

/// An object store path split into its addressable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub scheme: Scheme,
    /// Swift tenant; always `None` for S3.
    pub tenant: Option<String>,
    /// S3 bucket or Swift container.
    pub bucket: Option<String>,
    /// Key inside the bucket, possibly empty.
    pub key: String,
}

impl ObjectLocation {
    /// Parses `s3://bucket/key` or `swift://tenant/container/key`.
    pub fn parse(path: &Path) -> StorageResult<Self> {
        let raw = path.as_str();
        let Some(scheme) = Scheme::from_path(raw) else {
            return Err(Box::new(StorageError::invalid_path(
                raw,
                "missing swift:// or s3:// scheme",
            )));
        };
        let mut rest = &raw[scheme.prefix().len()..];
        let tenant = match scheme {
            Scheme::S3 => None,
            Scheme::Swift => {
                let (tenant, remainder) = rest.split_once('/').unwrap_or((rest, ""));
                if tenant.is_empty() {
                    return Err(Box::new(StorageError::invalid_path(raw, "missing tenant")));
                }
                rest = remainder;
                Some(tenant.to_string())
            }
        };
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        Ok(Self {
            scheme,
            tenant,
            bucket: (!bucket.is_empty()).then(|| bucket.to_string()),
            key: key.to_string(),
        })
    }

    /// The bucket name handed to the client.
    pub fn bucket_id(&self) -> Option<String> {
        let bucket = self.bucket.as_ref()?;
        Some(match &self.tenant {
            Some(tenant) => format!("{}/{}", tenant, bucket),
            None => bucket.clone(),
        })
    }

    /// Path of an object in the same bucket.
    pub fn path_for(&self, key: &str) -> Path {
        let bucket_id = self.bucket_id().unwrap_or_default();
        Path::object_store(format!("{}{}/{}", self.scheme.prefix(), bucket_id, key))
    }
}

/// Key prefix of everything below `key` when it is seen as a directory.
fn directory_prefix(key: &str) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{}/", key.trim_end_matches('/'))
    }
}

fn is_sentinel(key: &str) -> bool {
    key.ends_with('/')
}

/// Options for [`ObjectStoreOperations::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only objects whose key below the path starts with this string.
    pub starts_with: Option<String>,
    pub limit: Option<usize>,
}

/// Object store backend over an [`ObjectStoreClient`](super::ObjectStoreClient).
#[derive(Debug, Clone)]
pub struct ObjectStoreOperations {
    client: StoreHandle,
}

/// A bucket and key resolved from a path that names a bucket.
struct Located {
    location: ObjectLocation,
    bucket: String,
}

impl ObjectStoreOperations {
    pub fn new(client: StoreHandle) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &StoreHandle {
        &self.client
    }

    /// Resolves the bucket of `path`, or NotImplemented for tenant/scheme-only paths.
    fn locate(&self, path: &Path, operation: &'static str) -> StorageResult<Located> {
        let location = ObjectLocation::parse(path)?;
        match location.bucket_id() {
            Some(bucket) => Ok(Located { location, bucket }),
            None => Err(Box::new(StorageError::not_implemented(operation, path.as_str()))),
        }
    }

    /// Every non-sentinel object whose key starts with `prefix`.
    fn objects_under(
        &self,
        bucket: &str,
        prefix: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<ObjectMetadata>> {
        let entries = self
            .client
            .list_objects(bucket, &ListRequest::recursive(prefix))?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                ListEntry::Object(metadata) if !is_sentinel(&metadata.key) => Some(metadata),
                _ => None,
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Lists every object below `path`, recursively.
    ///
    /// A missing bucket is NotFound; a missing folder gives an empty list.
    #[instrument(skip(self), fields(path = %path))]
    pub fn list(&self, path: &Path, options: &ListOptions) -> StorageResult<Vec<Path>> {
        let Located { location, bucket } = self.locate(path, "list")?;
        let prefix = format!(
            "{}{}",
            directory_prefix(&location.key),
            options.starts_with.as_deref().unwrap_or("")
        );
        let objects = self.objects_under(&bucket, &prefix, options.limit)?;
        debug!(count = objects.len(), prefix = %prefix, "listed objects");
        Ok(objects
            .iter()
            .map(|metadata| location.path_for(&metadata.key))
            .collect())
    }

    /// Uploads local files and directories below `dest`.
    ///
    /// A file lands at `dest/<name>`. A directory uploads its contents relative
    /// to itself, and empty directories become sentinel objects. Returns the
    /// paths of the created objects.
    #[instrument(skip(self, sources, options), fields(dest = %dest, count = sources.len()))]
    pub fn upload(
        &self,
        dest: &Path,
        sources: &[Path],
        options: &UploadOptions,
    ) -> StorageResult<Vec<Path>> {
        let Located { location, bucket } = self.locate(dest, "upload")?;
        let base = directory_prefix(&location.key);
        let mut uploaded = Vec::new();
        for source in sources {
            if !source.is_local() {
                return Err(Box::new(StorageError::not_implemented(
                    "upload from object store",
                    source.as_str(),
                )));
            }
            let root = source.to_path_buf();
            let metadata = fs::metadata(&root)
                .map_err(|e| Box::new(StorageError::from_io(root.clone(), e)))?;
            if !metadata.is_dir() {
                let key = format!("{}{}", base, source.basename());
                let data = fs::read(&root).map_err(|e| Box::new(StorageError::from_io(root.clone(), e)))?;
                self.client.put_object(&bucket, &key, data, options)?;
                uploaded.push(location.path_for(&key));
                continue;
            }
            for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| Box::new(StorageError::from_io(root.clone(), e.into())))?;
                let relative = entry
                    .path()
                    .strip_prefix(&root)
                    .map_err(|_e| storage_base::err!("walked outside of {}", source))?;
                let relative = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if entry.file_type().is_dir() {
                    let is_empty = fs::read_dir(entry.path())
                        .map_err(|e| Box::new(StorageError::from_io(entry.path(), e)))?
                        .next()
                        .is_none();
                    if is_empty {
                        let key = format!("{}{}/", base, relative);
                        self.client.put_object(&bucket, &key, Vec::new(), options)?;
                        uploaded.push(location.path_for(&key));
                    }
                    continue;
                }
                let key = format!("{}{}", base, relative);
                let data = fs::read(entry.path())
                    .map_err(|e| Box::new(StorageError::from_io(entry.path(), e)))?;
                self.client
                    .put_object(&bucket, &key, data, options)
                    .with_context(|| format!("uploading {}", entry.path().display()))?;
                uploaded.push(location.path_for(&key));
            }
        }
        debug!(count = uploaded.len(), "upload finished");
        Ok(uploaded)
    }

    /// Uploads one local file as exactly the object `dest`.
    #[instrument(skip(self, options), fields(source = %source, dest = %dest))]
    pub fn upload_file(
        &self,
        source: &Path,
        dest: &Path,
        options: &UploadOptions,
    ) -> StorageResult<()> {
        let Located { location, bucket } = self.locate(dest, "upload")?;
        if location.key.is_empty() || is_sentinel(&location.key) {
            return Err(Box::new(StorageError::invalid_path(
                dest.as_str(),
                "an object name is required",
            )));
        }
        let data = fs::read(source).map_err(|e| io_error(source, e))?;
        self.client.put_object(&bucket, &location.key, data, options)
    }

    /// Downloads every object below `source` into the local directory `dest`.
    ///
    /// Sentinels create empty directories. Local conflicts surface as file errors.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn download(&self, source: &Path, dest: &Path) -> StorageResult<Vec<Path>> {
        if !dest.is_local() {
            return Err(Box::new(StorageError::not_implemented(
                "download to object store",
                dest.as_str(),
            )));
        }
        let Located { location, bucket } = self.locate(source, "download")?;
        let prefix = directory_prefix(&location.key);
        let entries = self
            .client
            .list_objects(&bucket, &ListRequest::recursive(prefix.as_str()))?;
        // Every key is checked before anything touches the local filesystem
        let mut plan = Vec::new();
        for entry in entries {
            let ListEntry::Object(metadata) = entry else {
                continue;
            };
            let Some(relative) = metadata.key.strip_prefix(prefix.as_str()) else {
                debug!(key = %metadata.key, "skipping key outside the listed prefix");
                continue;
            };
            if relative.is_empty() {
                continue;
            }
            let sentinel = is_sentinel(relative);
            let target = dest.join(local_components(source, dest.variant(), relative)?);
            plan.push((target, sentinel, metadata.key));
        }
        let mut written = Vec::new();
        for (target, sentinel, key) in plan {
            if sentinel {
                fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
                continue;
            }
            let parent = target.dirname();
            fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;
            let data = self.client.get_object(&bucket, &key)?;
            fs::write(&target, data).map_err(|e| io_error(&target, e))?;
            written.push(target);
        }
        debug!(count = written.len(), "download finished");
        Ok(written)
    }

    /// Downloads one object to a local file.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn download_object(&self, source: &Path, dest: &Path) -> StorageResult<()> {
        let Located { location, bucket } = self.locate(source, "download")?;
        let data = self.client.get_object(&bucket, &location.key)?;
        fs::write(dest, data).map_err(|e| io_error(dest, e))
    }
}

/// Splits the part of a key below the downloaded prefix into local path components.
///
/// Components that would leave the destination directory are rejected.
fn local_components<'a>(
    source: &Path,
    variant: PathVariant,
    relative: &'a str,
) -> StorageResult<Vec<&'a str>> {
    let components: Vec<&str> = relative
        .strip_suffix('/')
        .unwrap_or(relative)
        .split('/')
        .collect();
    let escapes = components.iter().any(|component| {
        matches!(*component, "" | "." | "..")
            || (variant == PathVariant::Windows && component.contains(['\\', ':']))
    });
    if escapes {
        debug!(relative, "refusing key that leaves the destination");
        return Err(Box::new(StorageError::invalid_path(
            format!("{}/{}", source.as_str().trim_end_matches('/'), relative),
            "object key does not map to a location below the destination",
        )));
    }
    Ok(components)
}

fn io_error(path: &Path, error: io::Error) -> Box<StorageError> {
    Box::new(StorageError::from_io(path.as_str(), error))
}

impl PathOperations for ObjectStoreOperations {
    #[instrument(skip(self), fields(path = %path))]
    fn exists(&self, path: &Path) -> StorageResult<bool> {
        Ok(self.isfile(path)? || self.isdir(path)?)
    }

    fn isabs(&self, _path: &Path) -> StorageResult<bool> {
        Ok(true)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn isdir(&self, path: &Path) -> StorageResult<bool> {
        let Located { location, bucket } = self.locate(path, "isdir")?;
        if location.key.is_empty() {
            return self.client.bucket_exists(&bucket);
        }
        let request = ListRequest::recursive(directory_prefix(&location.key)).with_limit(1);
        match self.client.list_objects(&bucket, &request) {
            Ok(entries) => Ok(!entries.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn isfile(&self, path: &Path) -> StorageResult<bool> {
        let Located { location, bucket } = self.locate(path, "isfile")?;
        if location.key.is_empty() || is_sentinel(&location.key) {
            return Ok(false);
        }
        Ok(self.client.head_object(&bucket, &location.key)?.is_some())
    }

    fn islink(&self, _path: &Path) -> StorageResult<bool> {
        Ok(false)
    }

    fn ismount(&self, _path: &Path) -> StorageResult<bool> {
        Ok(true)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn listdir(&self, path: &Path) -> StorageResult<Vec<Path>> {
        let Located { location, bucket } = self.locate(path, "listdir")?;
        let prefix = directory_prefix(&location.key);
        let entries = self
            .client
            .list_objects(&bucket, &ListRequest::delimited(prefix.as_str()))
            .with_context(|| format!("listing {}", path))?;
        let children: Vec<Path> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                ListEntry::Object(metadata) if metadata.key == prefix => None,
                ListEntry::Object(metadata) => Some(location.path_for(&metadata.key)),
                ListEntry::Prefix(child) => Some(location.path_for(&child)),
            })
            .collect();
        debug!(count = children.len(), "listed directory");
        Ok(children)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn glob(&self, path: &Path, pattern: &str) -> StorageResult<Vec<Path>> {
        let full = path / pattern;
        let Located { location, bucket } = self.locate(&full, "glob")?;
        let key_prefix = match location.key.strip_suffix('*') {
            Some(prefix) if !prefix.contains(['*', '?', '[']) => prefix.to_string(),
            _ => {
                debug!(pattern, "only a single trailing wildcard is supported");
                return Err(Box::new(StorageError::not_implemented(
                    "glob with wildcards other than a single trailing '*'",
                    full.as_str(),
                )));
            }
        };
        let objects = self.objects_under(&bucket, &key_prefix, None)?;
        Ok(objects
            .iter()
            .map(|metadata| location.path_for(&metadata.key))
            .collect())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove(&self, path: &Path) -> StorageResult<()> {
        let Located { location, bucket } = self.locate(path, "remove")?;
        if location.key.is_empty() {
            return Err(Box::new(StorageError::not_implemented("remove", path.as_str())));
        }
        if self.client.head_object(&bucket, &location.key)?.is_none() {
            return Err(Box::new(StorageError::not_found(path.as_str())));
        }
        self.client.delete_object(&bucket, &location.key)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn rmtree(&self, path: &Path) -> StorageResult<()> {
        let Located { location, bucket } = self.locate(path, "rmtree")?;
        let prefix = directory_prefix(&location.key);
        let entries = match self
            .client
            .list_objects(&bucket, &ListRequest::recursive(prefix.as_str()))
        {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                debug!("bucket does not exist, nothing to remove");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let mut keys: Vec<String> = entries
            .into_iter()
            .filter_map(|entry| match entry {
                ListEntry::Object(metadata) => Some(metadata.key),
                ListEntry::Prefix(_) => None,
            })
            .collect();
        if !location.key.is_empty() && self.client.head_object(&bucket, &location.key)?.is_some() {
            keys.push(location.key.clone());
        }
        debug!(count = keys.len(), "removing objects");
        for key in keys {
            self.client.delete_object(&bucket, &key)?;
        }
        Ok(())
    }

    #[instrument(skip(self, options), fields(path = %path, mode = ?options.mode))]
    fn open(&self, path: &Path, options: &OpenOptions) -> StorageResult<Box<dyn ReadWrite>> {
        let Located { location, bucket } = self.locate(path, "open")?;
        match options.mode {
            OpenMode::Read => {
                let data = self.client.get_object(&bucket, &location.key).map_err(|e| {
                    if e.is_not_found() {
                        Box::new(StorageError::not_found(path.as_str()))
                    } else {
                        e
                    }
                })?;
                Ok(Box::new(Cursor::new(data)))
            }
            OpenMode::Write => Ok(Box::new(ObjectWriter {
                client: self.client.clone(),
                bucket,
                key: location.key,
                options: options.upload_options.clone(),
                buffer: Vec::new(),
                uploaded: false,
            })),
            OpenMode::Append => Err(Box::new(StorageError::not_implemented(
                "open in append mode",
                path.as_str(),
            ))),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn stat(&self, path: &Path) -> StorageResult<PathStat> {
        let Located { location, bucket } = self.locate(path, "stat")?;
        self.client
            .head_object(&bucket, &location.key)?
            .map(PathStat::Object)
            .ok_or_else(|| Box::new(StorageError::not_found(path.as_str())))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn getsize(&self, path: &Path) -> StorageResult<u64> {
        if self.isfile(path)? {
            return Ok(self.stat(path)?.size());
        }
        if self.isdir(path)? {
            return Ok(0);
        }
        Err(Box::new(StorageError::not_found(path.as_str())))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn walkfiles(&self, path: &Path, pattern: Option<&str>) -> StorageResult<Vec<Path>> {
        let matcher = pattern
            .map(|pattern| compile_glob(pattern, PathVariant::ObjectStore))
            .transpose()?;
        let files = self.list(path, &ListOptions::default())?;
        Ok(files
            .into_iter()
            .filter(|file| {
                matcher
                    .as_ref()
                    .is_none_or(|matcher| matcher.is_match(file.basename().as_str()))
            })
            .collect())
    }
}

/// Write stream that uploads its buffer on flush or drop.
struct ObjectWriter {
    client: StoreHandle,
    bucket: String,
    key: String,
    options: UploadOptions,
    buffer: Vec<u8>,
    uploaded: bool,
}

impl ObjectWriter {
    fn upload(&mut self) -> StorageResult<()> {
        self.client
            .put_object(&self.bucket, &self.key, self.buffer.clone(), &self.options)?;
        self.uploaded = true;
        Ok(())
    }
}

impl Read for ObjectWriter {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "object opened for writing cannot be read",
        ))
    }
}

impl Write for ObjectWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.uploaded = false;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.upload().map_err(io::Error::other)
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if self.uploaded {
            return;
        }
        if let Err(e) = self.upload() {
            warn!(bucket = %self.bucket, key = %self.key, error = %e, "failed to upload object on close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swift(path: &str) -> Path {
        Path::object_store(format!("swift://{}", path))
    }

    #[test]
    fn test_parse_swift_location() {
        let location = ObjectLocation::parse(&swift("AUTH_x/cont/dir/obj")).unwrap();
        assert_eq!(location.scheme, Scheme::Swift);
        assert_eq!(location.tenant.as_deref(), Some("AUTH_x"));
        assert_eq!(location.bucket.as_deref(), Some("cont"));
        assert_eq!(location.key, "dir/obj");
        assert_eq!(location.bucket_id().as_deref(), Some("AUTH_x/cont"));
        assert_eq!(location.path_for("k"), "swift://AUTH_x/cont/k");
    }

    #[test]
    fn test_parse_partial_locations() {
        let tenant_only = ObjectLocation::parse(&swift("AUTH_x")).unwrap();
        assert_eq!(tenant_only.bucket, None);
        assert_eq!(tenant_only.bucket_id(), None);

        let bucket_only = ObjectLocation::parse(&Path::object_store("s3://bucket/")).unwrap();
        assert_eq!(bucket_only.bucket.as_deref(), Some("bucket"));
        assert_eq!(bucket_only.key, "");

        assert!(ObjectLocation::parse(&swift("")).is_err());
        assert!(ObjectLocation::parse(&Path::object_store("/local")).is_err());
    }

    #[test]
    fn test_directory_prefix() {
        assert_eq!(directory_prefix(""), "");
        assert_eq!(directory_prefix("dir"), "dir/");
        assert_eq!(directory_prefix("dir/"), "dir/");
    }
}
