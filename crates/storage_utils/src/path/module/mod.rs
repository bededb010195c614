/* 📖 # What is a path module?

A path module is the stateless set of string functions for one naming convention:
POSIX, Windows, or object store URLs. Every Path points at exactly one module via its
variant and delegates all naming operations to it. Modules never touch the
filesystem except where the operation itself is defined against the current
directory (abspath) or the real filesystem (realpath).
*/

use std::fmt;

use storage_base::{StorageError, StorageResult};

mod object_store;
mod posix;
mod windows;

pub use object_store::{OBJECT_STORE, ObjectStoreModule};
pub use posix::{POSIX, PosixModule};
pub use windows::{WINDOWS, WindowsModule};

/// Pure string manipulation functions for one path convention.
///
/// Implementations are process-wide constants, referenced through
/// `&'static dyn PathModule` and never mutated.
pub trait PathModule: fmt::Debug + Send + Sync + 'static {
    /// Primary separator for this convention.
    fn sep(&self) -> &'static str;

    /// Joins `part` onto `base`, inserting a separator if needed.
    fn join(&self, base: &str, part: &str) -> String;

    /// Splits into `(head, tail)` where tail is the final component.
    fn split(&self, path: &str) -> (String, String);

    /// Splits into `(root, ext)` so that `root + ext == path`.
    fn splitext(&self, path: &str) -> (String, String);

    /// Splits into `(drive, rest)`; the drive is empty where the convention has none.
    fn splitdrive(&self, path: &str) -> (String, String);

    fn normpath(&self, path: &str) -> String;

    fn isabs(&self, path: &str) -> bool;

    fn normcase(&self, path: &str) -> String;

    fn expanduser(&self, path: &str) -> String;

    fn expandvars(&self, path: &str) -> String;

    /// Absolute, normalized form of `path`, resolved against the current directory.
    fn abspath(&self, path: &str) -> StorageResult<String>;

    /// Like [`PathModule::abspath`], additionally resolving symbolic links where supported.
    fn realpath(&self, path: &str) -> StorageResult<String>;

    fn dirname(&self, path: &str) -> String {
        self.split(path).0
    }

    fn basename(&self, path: &str) -> String {
        self.split(path).1
    }
}

/// Looks up an environment variable for the expansion functions.
pub(crate) fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub(crate) fn current_dir_string() -> StorageResult<String> {
    let cwd = std::env::current_dir().map_err(|e| Box::new(StorageError::from_io(".", e)))?;
    Ok(cwd.to_string_lossy().into_owned())
}

/// Extension split shared by all conventions.
///
/// The extension starts at the last dot of the final component, unless the
/// component consists only of leading dots up to that point (`.bashrc`).
pub(crate) fn split_extension(path: &str, separators: &[char]) -> (String, String) {
    let no_extension = || (path.to_string(), String::new());
    let Some(dot_index) = path.rfind('.') else {
        return no_extension();
    };
    let filename_start = match path.rfind(separators) {
        Some(sep_index) if sep_index > dot_index => return no_extension(),
        Some(sep_index) => sep_index + 1,
        None => 0,
    };
    if path[filename_start..dot_index].chars().any(|c| c != '.') {
        let (root, ext) = path.split_at(dot_index);
        (root.to_string(), ext.to_string())
    } else {
        no_extension()
    }
}
