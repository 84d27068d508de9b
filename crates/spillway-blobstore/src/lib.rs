pub mod fs;
pub mod memory;
pub mod store;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use store::{BlobStore, BlobStoreError, BlobStoreResult};
