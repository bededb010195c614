/* 📖 # What are path operations?

Naming operations (join, dirname, normpath, ...) are pure and live on Path. Anything
that touches storage goes through the `PathOperations` trait instead. Two backends
implement it:
- `FileSystemOperations` for local POSIX and Windows paths
- `ObjectStoreOperations` for Swift and S3 paths, over an `ObjectStoreClient`

`Storage` ties them together and selects the backend from each path's variant.
*/

mod client;
mod local;
mod memory;
mod object_store;
mod storage;
mod traits;

pub use client::{
    ListEntry, ListRequest, ObjectMetadata, ObjectStoreClient, StoreHandle, UploadOptions,
};
pub use local::{DirectoryScope, FileSystemOperations};
pub use memory::MemoryStore;
pub use object_store::{ListOptions, ObjectLocation, ObjectStoreOperations};
pub use storage::Storage;
pub use traits::{OpenMode, OpenOptions, PathOperations, PathStat, ReadWrite};
