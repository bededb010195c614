use relative_path::RelativePath;
use storage_base::StorageResult;

use super::{PathModule, posix, split_extension};
use crate::path::Scheme;

/// Path functions for object store URLs (`swift://...`, `s3://...`).
///
/// Behaves like POSIX on the part after the scheme, but never collapses the
/// `scheme://` prefix and treats every path as absolute.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectStoreModule;

pub static OBJECT_STORE: ObjectStoreModule = ObjectStoreModule;

/// Splits `swift://a/b` into `("swift://", "a/b")`.
fn split_scheme(path: &str) -> (&str, &str) {
    match Scheme::from_path(path) {
        Some(scheme) => path.split_at(scheme.prefix().len()),
        None => ("", path),
    }
}

impl PathModule for ObjectStoreModule {
    fn sep(&self) -> &'static str {
        "/"
    }

    fn join(&self, base: &str, part: &str) -> String {
        if Scheme::from_path(part).is_some() {
            return part.to_string();
        }
        // Keys are relative to the bucket, a leading separator does not reset the path
        posix::join(base, part.trim_start_matches('/'))
    }

    fn split(&self, path: &str) -> (String, String) {
        let (scheme, rest) = split_scheme(path);
        let (head, tail) = posix::split(rest);
        (format!("{}{}", scheme, head), tail)
    }

    fn splitext(&self, path: &str) -> (String, String) {
        split_extension(path, &['/'])
    }

    fn splitdrive(&self, path: &str) -> (String, String) {
        (String::new(), path.to_string())
    }

    fn normpath(&self, path: &str) -> String {
        let (scheme, rest) = split_scheme(path);
        if scheme.is_empty() {
            return posix::normpath(path);
        }
        format!("{}{}", scheme, RelativePath::new(rest).normalize())
    }

    fn isabs(&self, _path: &str) -> bool {
        true
    }

    fn normcase(&self, path: &str) -> String {
        path.to_string()
    }

    fn expanduser(&self, path: &str) -> String {
        path.to_string()
    }

    fn expandvars(&self, path: &str) -> String {
        posix::expandvars_with(path, super::env_lookup)
    }

    fn abspath(&self, path: &str) -> StorageResult<String> {
        Ok(self.normpath(path))
    }

    fn realpath(&self, path: &str) -> StorageResult<String> {
        Ok(self.normpath(path))
    }
}
