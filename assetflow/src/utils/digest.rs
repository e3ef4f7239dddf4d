//! Content digests for produced artifacts and output manifests.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Returns the lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Reads a file and returns its size and hex SHA-256.
pub async fn file_digest(path: &Path) -> std::io::Result<(u64, String)> {
    let bytes = tokio::fs::read(path).await?;
    Ok((bytes.len() as u64, sha256_hex(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.css");
        std::fs::write(&path, "abc").unwrap();

        let (bytes, digest) = file_digest(&path).await.unwrap();
        assert_eq!(bytes, 3);
        assert_eq!(digest, sha256_hex(b"abc"));
    }
}
