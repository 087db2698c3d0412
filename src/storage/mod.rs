//! 存储后端：表存储与 blob 存储的统一接口，以及内存、本地文件系统两种实现

mod account;
mod blob_store;
mod error;
mod fs;
mod memory;
mod table_store;

pub use account::{development_blobs, development_tables, StorageAccount};
pub use blob_store::BlobStore;
pub use error::StorageError;
pub use fs::{FsBlobStore, FsTableStore};
pub use memory::{MemoryBlobStore, MemoryTableStore, TableRow};
pub use table_store::TableStore;
