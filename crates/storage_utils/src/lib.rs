/* 📖 # What does storage_utils provide?
One `Path` type for local files and for objects in Swift or S3. Naming operations
(join, split, normalize, expand) work on any path without touching storage. I/O goes
through `ops::Storage`, which selects the local filesystem or an object store client
from the path itself, so calling code never branches on the backend.
*/

pub mod config;
pub mod ops;
mod ops_tests;
pub mod path;

pub use config::{StorageConfig, load_config};
pub use ops::{PathOperations, Storage};
pub use path::{Path, PathModule, PathVariant, Scheme};
pub use storage_base::{ErrorKind, ResultExt, StorageError, StorageResult};
