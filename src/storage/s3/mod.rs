//! S3 object storage
//!
//! Request signing (SigV4, presigned form) and the few object calls the
//! service needs. No SDK: URLs are signed locally and object requests are
//! sent through reqwest against presigned URLs.

pub mod client;
pub mod provider;
pub mod request;
pub mod signer;

pub use provider::S3Storage;
