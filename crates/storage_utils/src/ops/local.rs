use std::fs;
use std::io;
use std::path::PathBuf;

use globset::{GlobBuilder, GlobMatcher};
use storage_base::{StorageError, StorageResult};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::traits::{OpenMode, OpenOptions, PathOperations, PathStat, ReadWrite};
use crate::path::{Path, PathVariant};

/* 📖 # Why use std::fs directly?

Local operations are synchronous and blocking like every other operation in this
crate. std::fs covers them, walkdir adds recursive traversal, and globset does the
pattern matching. Each call maps the native error through `StorageError::from_io`, so
a missing file reports NotFound here exactly like a missing object does on a store.
*/

const GLOB_META: &[char] = &['*', '?', '[', '{'];

fn io_error(path: &Path, error: io::Error) -> Box<StorageError> {
    Box::new(StorageError::from_io(path.as_str(), error))
}

/// Compiles a glob pattern. Windows paths disable backslash escapes so the
/// separator stays literal.
pub(crate) fn compile_glob(pattern: &str, variant: PathVariant) -> StorageResult<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(variant != PathVariant::Windows)
        .build()
        .map_err(|e| {
            debug!(pattern, error = %e, "failed to compile glob pattern");
            storage_base::err!("Invalid glob pattern '{}': {}", pattern, e)
        })?;
    Ok(glob.compile_matcher())
}

/// Local filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemOperations;

impl FileSystemOperations {
    pub fn new() -> Self {
        Self
    }

    fn ensure_local(path: &Path, operation: &'static str) -> StorageResult<()> {
        if path.is_local() {
            Ok(())
        } else {
            Err(Box::new(StorageError::not_implemented(operation, path.as_str())))
        }
    }

    /// Wildcards do not match a leading dot unless the pattern component starts with one.
    fn hides_dot_entry(
        candidate: &std::path::Path,
        walk_root: &str,
        pattern_parts: &[&str],
    ) -> bool {
        let Ok(relative) = candidate.strip_prefix(walk_root) else {
            return false;
        };
        relative.components().zip(pattern_parts).any(|(component, pattern)| {
            component.as_os_str().to_string_lossy().starts_with('.') && !pattern.starts_with('.')
        })
    }

    /// Runs `f` with the process working directory set to `path`.
    ///
    /// The previous directory is restored when `f` returns, fails or panics.
    pub fn with_directory<T>(
        &self,
        path: &Path,
        f: impl FnOnce() -> StorageResult<T>,
    ) -> StorageResult<T> {
        let _scope = DirectoryScope::enter(path)?;
        f()
    }

    /// Copies one file. A directory destination receives the file under its own name.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn copy_file(&self, source: &Path, dest: &Path) -> StorageResult<Path> {
        Self::ensure_local(source, "copy")?;
        Self::ensure_local(dest, "copy")?;
        let target = if dest.to_path_buf().is_dir() {
            dest / source.basename().as_str()
        } else {
            dest.clone()
        };
        fs::copy(source, &target).map_err(|e| io_error(source, e))?;
        debug!(target = %target, "copied file");
        Ok(target)
    }

    /// Copies a directory tree. The destination must not exist yet.
    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    pub fn copy_tree(&self, source: &Path, dest: &Path) -> StorageResult<()> {
        Self::ensure_local(source, "copytree")?;
        Self::ensure_local(dest, "copytree")?;
        if fs::symlink_metadata(dest).is_ok() {
            return Err(io_error(
                dest,
                io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
            ));
        }
        let root = source.to_path_buf();
        let target_root = dest.to_path_buf();
        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|e| io_error(source, e.into()))?;
            let relative = entry.path().strip_prefix(&root).map_err(|_e| {
                storage_base::err!("walked outside of {}: {}", source, entry.path().display())
            })?;
            let target = target_root.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|e| Box::new(StorageError::from_io(target.clone(), e)))?;
            } else {
                fs::copy(entry.path(), &target)
                    .map_err(|e| Box::new(StorageError::from_io(entry.path(), e)))?;
            }
        }
        debug!("copied tree");
        Ok(())
    }

    fn child(path: &Path, raw: PathBuf) -> Path {
        Path::with_variant(raw.to_string_lossy(), path.variant())
    }
}

impl PathOperations for FileSystemOperations {
    #[instrument(skip(self), fields(path = %path))]
    fn exists(&self, path: &Path) -> StorageResult<bool> {
        Self::ensure_local(path, "exists")?;
        Ok(fs::metadata(path).is_ok())
    }

    fn isabs(&self, path: &Path) -> StorageResult<bool> {
        Ok(path.isabs())
    }

    fn isdir(&self, path: &Path) -> StorageResult<bool> {
        Self::ensure_local(path, "isdir")?;
        Ok(path.to_path_buf().is_dir())
    }

    fn isfile(&self, path: &Path) -> StorageResult<bool> {
        Self::ensure_local(path, "isfile")?;
        Ok(path.to_path_buf().is_file())
    }

    fn islink(&self, path: &Path) -> StorageResult<bool> {
        Self::ensure_local(path, "islink")?;
        Ok(fs::symlink_metadata(path)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn ismount(&self, path: &Path) -> StorageResult<bool> {
        Self::ensure_local(path, "ismount")?;
        let Ok(metadata) = fs::symlink_metadata(path) else {
            return Ok(false);
        };
        if metadata.file_type().is_symlink() {
            return Ok(false);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let parent = path / "..";
            let Ok(parent_metadata) = fs::metadata(&parent) else {
                return Ok(false);
            };
            Ok(metadata.dev() != parent_metadata.dev() || metadata.ino() == parent_metadata.ino())
        }
        #[cfg(not(unix))]
        {
            let (_, rest) = path.abspath()?.splitdrive();
            Ok(rest == "\\" || rest == "/")
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn listdir(&self, path: &Path) -> StorageResult<Vec<Path>> {
        Self::ensure_local(path, "listdir")?;
        let entries = fs::read_dir(path).map_err(|e| io_error(path, e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(path, e))?;
            children.push(path / entry.file_name().to_string_lossy().as_ref());
        }
        debug!(count = children.len(), "listed directory");
        Ok(children)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn glob(&self, path: &Path, pattern: &str) -> StorageResult<Vec<Path>> {
        Self::ensure_local(path, "glob")?;
        let full = path / pattern;
        let text = full.as_str();
        let separators: &[char] = match path.variant() {
            PathVariant::Windows => &['\\', '/'],
            _ => &['/'],
        };
        let Some(first_meta) = text.find(GLOB_META) else {
            let exists = fs::symlink_metadata(&full).is_ok();
            return Ok(if exists { vec![full] } else { Vec::new() });
        };
        // Walk from the deepest directory that contains no wildcard
        let (base, rest) = match text[..first_meta].rfind(separators) {
            Some(0) => (&text[..1], &text[1..]),
            Some(index) => (&text[..index], &text[index + 1..]),
            None => ("", text),
        };
        let directories_only = rest.ends_with(separators);
        let pattern_parts: Vec<&str> = rest
            .trim_end_matches(separators)
            .split(separators)
            .collect();
        let depth = pattern_parts.len();
        let matcher = compile_glob(text, path.variant())?;
        let walk_root = if base.is_empty() { "." } else { base };
        debug!(walk_root, depth, directories_only, "walking for glob matches");
        let mut matches = Vec::new();
        for entry in WalkDir::new(walk_root)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
        {
            let Ok(entry) = entry else {
                continue;
            };
            if directories_only && !entry.path().is_dir() {
                continue;
            }
            if Self::hides_dot_entry(entry.path(), walk_root, &pattern_parts) {
                continue;
            }
            let candidate = entry.path().to_string_lossy();
            let mut candidate = if base.is_empty() {
                candidate.strip_prefix("./").unwrap_or(&candidate).to_string()
            } else {
                candidate.into_owned()
            };
            if directories_only {
                candidate.push_str(&text[text.trim_end_matches(separators).len()..]);
            }
            if matcher.is_match(&candidate) {
                matches.push(Path::with_variant(candidate, path.variant()));
            }
        }
        debug!(count = matches.len(), "glob finished");
        Ok(matches)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove(&self, path: &Path) -> StorageResult<()> {
        Self::ensure_local(path, "remove")?;
        fs::remove_file(path).map_err(|e| {
            debug!(error = %e, "failed to remove file");
            io_error(path, e)
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    fn rmtree(&self, path: &Path) -> StorageResult<()> {
        Self::ensure_local(path, "rmtree")?;
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("nothing to remove");
                Ok(())
            }
            Err(e) => Err(io_error(path, e)),
        }
    }

    #[instrument(skip(self, options), fields(path = %path, mode = ?options.mode))]
    fn open(&self, path: &Path, options: &OpenOptions) -> StorageResult<Box<dyn ReadWrite>> {
        Self::ensure_local(path, "open")?;
        let mut native = fs::OpenOptions::new();
        match options.mode {
            OpenMode::Read => native.read(true),
            OpenMode::Write => native.write(true).create(true).truncate(true),
            OpenMode::Append => native.append(true).create(true),
        };
        let file = native.open(path).map_err(|e| io_error(path, e))?;
        Ok(Box::new(file))
    }

    fn stat(&self, path: &Path) -> StorageResult<PathStat> {
        Self::ensure_local(path, "stat")?;
        let metadata = fs::metadata(path).map_err(|e| io_error(path, e))?;
        Ok(PathStat::Local(metadata))
    }

    fn getsize(&self, path: &Path) -> StorageResult<u64> {
        Ok(self.stat(path)?.size())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn walkfiles(&self, path: &Path, pattern: Option<&str>) -> StorageResult<Vec<Path>> {
        Self::ensure_local(path, "walkfiles")?;
        let matcher = pattern
            .map(|pattern| compile_glob(pattern, path.variant()))
            .transpose()?;
        let mut files = Vec::new();
        for entry in WalkDir::new(path.to_path_buf()).sort_by_file_name() {
            let entry = entry.map_err(|e| io_error(path, e.into()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let name_matches = matcher
                .as_ref()
                .is_none_or(|matcher| matcher.is_match(entry.file_name()));
            if name_matches {
                files.push(Self::child(path, entry.into_path()));
            }
        }
        debug!(count = files.len(), "walked files");
        Ok(files)
    }
}

/// Changes the process working directory until dropped.
///
/// The working directory is global to the process, so scopes must not be used
/// from several threads at once.
#[derive(Debug)]
pub struct DirectoryScope {
    previous: PathBuf,
}

impl DirectoryScope {
    #[instrument(fields(path = %path))]
    pub fn enter(path: &Path) -> StorageResult<Self> {
        FileSystemOperations::ensure_local(path, "chdir")?;
        let previous = std::env::current_dir().map_err(|e| io_error(path, e))?;
        std::env::set_current_dir(path).map_err(|e| io_error(path, e))?;
        debug!(previous = %previous.display(), "entered directory");
        Ok(Self { previous })
    }

    pub fn previous(&self) -> &std::path::Path {
        &self.previous
    }
}

impl Drop for DirectoryScope {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!(previous = %self.previous.display(), error = %e, "failed to restore working directory");
        }
    }
}
