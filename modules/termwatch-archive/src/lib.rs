pub mod archiver;
pub mod backends;
pub mod cursor_store;
pub mod error;
pub mod keys;
pub mod object_store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use archiver::{check_batch_order, JsonlArchiver};
pub use backends::{GcsObjectStore, LocalObjectStore};
pub use cursor_store::ObjectCursorStore;
pub use error::{Result, StorageError};
pub use keys::archive_key;
pub use object_store::{store_from_config, ObjectStore};
