pub mod gcs;
pub mod local;

pub use gcs::GcsObjectStore;
pub use local::LocalObjectStore;
