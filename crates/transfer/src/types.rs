use std::path::{Path, PathBuf};

use crate::TransferError;

/// A file selected for upload, and where on the server it should land.
///
/// Immutable once a session starts; the size recorded here drives chunk
/// planning and the batch-level size checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Local path the file is read from.
    pub path: PathBuf,
    /// Name the server stores the file under.
    pub file_name: String,
    /// File length in bytes.
    pub size_bytes: u64,
    /// Server-side directory, relative to the server's library root.
    pub destination_directory: String,
}

impl UploadTarget {
    /// Builds a target from filesystem metadata.
    ///
    /// The file name is the last component of `path`.
    pub fn from_path(path: &Path, destination_directory: &str) -> Result<Self, TransferError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidPath(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TransferError::InvalidPath(format!("no file name: {}", path.display()))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes: metadata.len(),
            destination_directory: destination_directory.to_string(),
        })
    }
}

/// One contiguous slice of a file, sent as a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// 0-based position in the chunk sequence.
    pub index: u64,
    /// First byte of the slice.
    pub byte_start: u64,
    /// One past the last byte of the slice.
    pub byte_end: u64,
    /// `true` for the last chunk of the file.
    pub is_final: bool,
}

impl ChunkDescriptor {
    /// Number of bytes in this chunk.
    pub fn len(&self) -> u64 {
        self.byte_end - self.byte_start
    }

    /// `true` only for the single chunk planned for an empty file.
    pub fn is_empty(&self) -> bool {
        self.byte_end == self.byte_start
    }
}
