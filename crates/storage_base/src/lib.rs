/* 📖 # Why have storage_base as a separate crate?
storage_base provides the error type and tracing setup used by every other crate.
Keeping it free of path logic means the CLI and the path library agree on one
error taxonomy without depending on each other.
*/

pub mod error;
pub mod tracing;

pub use error::{ErrorKind, ResultExt, StorageError, StorageResult};
