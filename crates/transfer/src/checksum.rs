use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::pin::Pin;

use sha2::{Digest, Sha256};

use crate::TransferError;

/// Boxed future returned by [`ChecksumComputer::compute`].
pub type ChecksumFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, TransferError>> + Send + 'a>>;

/// Computes the whole-file digest that accompanies every chunk request.
///
/// Called exactly once per file, before the first chunk is sent. The
/// receiver recomputes the digest over the reassembled file, so the
/// implementation must hash the file's full contents.
pub trait ChecksumComputer: Send + Sync {
    /// Returns the lowercase hex digest of the file at `path`.
    fn compute<'a>(&'a self, path: &'a Path) -> ChecksumFuture<'a>;
}

/// SHA-256 over the file contents, hashed on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl ChecksumComputer for Sha256Checksum {
    fn compute<'a>(&'a self, path: &'a Path) -> ChecksumFuture<'a> {
        let path = path.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || calculate_file_checksum(&path))
                .await
                .map_err(|e| TransferError::Task(e.to_string()))?
        })
    }
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut hashed: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        hashed += n as u64;
    }
    tracing::debug!(path = %path.display(), bytes = hashed, "file hashed");
    Ok(hex::encode(hasher.finalize()))
}
