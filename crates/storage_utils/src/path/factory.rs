/* 📖 # How is the variant of a Path chosen?

A raw string is inspected once, when the generic constructor is used:
1. An object store scheme (`swift://`, `s3://`) always wins, whatever the host.
2. Otherwise the host's native convention decides between Windows and POSIX.

The concrete constructors (`Path::posix`, `Path::windows`, `Path::object_store`)
skip this lookup entirely.
*/

use storage_base::{StorageError, StorageResult};
use tracing::trace;

use super::{PathVariant, Scheme};

/// Native path convention of the host this binary was built for.
pub fn host_variant() -> StorageResult<PathVariant> {
    if cfg!(windows) {
        Ok(PathVariant::Windows)
    } else if cfg!(unix) {
        Ok(PathVariant::Posix)
    } else {
        Err(Box::new(StorageError::configuration(
            "host path convention is neither Windows nor POSIX",
        )))
    }
}

/// Selects the variant for a raw path string.
pub fn resolve_variant(raw: &str) -> StorageResult<PathVariant> {
    if let Some(scheme) = Scheme::from_path(raw) {
        trace!(%scheme, raw, "resolved object store path");
        return Ok(PathVariant::ObjectStore);
    }
    host_variant()
}
