pub mod provider;
pub mod s3;

#[cfg(test)]
pub mod memory;

pub use provider::*;
pub use s3::S3Storage;
