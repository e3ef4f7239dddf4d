//! Path and digest helpers shared by validation, stages and the manifest.

pub mod digest;
pub mod paths;

pub use digest::{file_digest, sha256_hex};
pub use paths::{expand, normalize, to_slash};
