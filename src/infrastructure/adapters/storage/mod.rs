//! Storage Adapter - 远端对象存储实现

#[cfg(test)]
mod fake_store;
mod s3_storage;

#[cfg(test)]
pub use fake_store::FakeRemoteStore;
pub use s3_storage::{S3Storage, S3StorageConfig};
