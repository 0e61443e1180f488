use sha2::{Digest, Sha256};
use std::path::Path;

/// Hex-encoded SHA-256 of a byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hex-encoded SHA-256 and size of a file on disk.
pub async fn sha256_file(path: &Path) -> std::io::Result<(String, u64)> {
    let data = tokio::fs::read(path).await?;
    Ok((sha256_hex(&data), data.len() as u64))
}
