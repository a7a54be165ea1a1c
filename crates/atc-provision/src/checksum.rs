//! SHA256 checksums for model artifacts.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

/// Buffer size for reading files during checksum computation.
const BUFFER_SIZE: usize = 65536; // 64 KB

/// Compute the SHA256 hash of a file as lowercase hex.
pub fn compute_file_sha256(path: &Path) -> io::Result<String> {
    debug!(path = %path.display(), "computing sha256");

    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Normalize a configured digest.
///
/// Accepts `sha256:abc…` and plain `abc…`, returning lowercase hex, or `None`
/// when the value is not a 64 character hex string.
pub fn normalize_digest(digest: &str) -> Option<String> {
    let hash = digest
        .trim()
        .strip_prefix("sha256:")
        .unwrap_or(digest.trim())
        .to_lowercase();
    if hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hash)
    } else {
        None
    }
}
