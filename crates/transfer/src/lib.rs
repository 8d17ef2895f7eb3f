//! File-side primitives for chunked uploads.
//!
//! Everything here is independent of the network: hashing a file before
//! it is sent, partitioning its byte range into ordered chunks, and
//! reading those chunks back from disk one at a time.

mod checksum;
mod chunked;
mod types;
mod validation;

pub use checksum::{
    ChecksumComputer, ChecksumFuture, Sha256Checksum, calculate_file_checksum, checksum_bytes,
};
pub use chunked::{ChunkReader, plan_chunks};
pub use types::{ChunkDescriptor, UploadTarget};
pub use validation::validate_destination_directory;

/// Default chunk size: 32 MiB.
///
/// The receiving endpoint appends chunks in index order, so every chunk
/// but the last is exactly this long.
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk {index} out of range for a {file_size} byte file")]
    ChunkOutOfRange { index: u64, file_size: u64 },

    #[error("background task failed: {0}")]
    Task(String),
}
