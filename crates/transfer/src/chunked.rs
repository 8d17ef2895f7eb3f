use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::types::ChunkDescriptor;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Chunk planning
// ---------------------------------------------------------------------------

/// Partitions `[0, file_size)` into ordered, contiguous chunks.
///
/// Every chunk is `chunk_size` bytes except the last, which holds the
/// remainder. An empty file still yields one zero-length chunk because
/// the receiver only finalizes a file when its last chunk arrives.
///
/// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (32 MiB) is used.
pub fn plan_chunks(file_size: u64, chunk_size: u64) -> Vec<ChunkDescriptor> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let total = file_size.div_ceil(chunk_size).max(1);
    (0..total)
        .map(|index| {
            let byte_start = index * chunk_size;
            ChunkDescriptor {
                index,
                byte_start,
                byte_end: (byte_start + chunk_size).min(file_size),
                is_final: index + 1 == total,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads planned chunks of a file from disk, one at a time.
pub struct ChunkReader {
    file: std::fs::File,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { file, file_size })
    }

    /// Reads exactly the bytes covered by `chunk`.
    ///
    /// Fails if the file has shrunk below the chunk's end since it was
    /// planned.
    pub fn read_chunk(&mut self, chunk: &ChunkDescriptor) -> Result<Vec<u8>, TransferError> {
        if chunk.byte_end > self.file_size {
            return Err(TransferError::ChunkOutOfRange {
                index: chunk.index,
                file_size: self.file_size,
            });
        }

        let mut buf = vec![0u8; chunk.len() as usize];
        if !buf.is_empty() {
            self.file.seek(SeekFrom::Start(chunk.byte_start))?;
            self.file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    /// File size observed when the reader was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const MIB: u64 = 1024 * 1024;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn assert_partition(chunks: &[ChunkDescriptor], file_size: u64) {
        let mut expected_start = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as u64);
            assert_eq!(chunk.byte_start, expected_start, "chunks must be contiguous");
            assert!(chunk.byte_end >= chunk.byte_start);
            assert_eq!(chunk.is_final, i + 1 == chunks.len());
            expected_start = chunk.byte_end;
        }
        assert_eq!(expected_start, file_size, "chunks must cover the whole file");
    }

    #[test]
    fn plan_exact_multiple() {
        let chunks = plan_chunks(64 * MIB, 32 * MIB);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 32 * MIB);
        assert_eq!(chunks[1].len(), 32 * MIB);
        assert_partition(&chunks, 64 * MIB);
    }

    #[test]
    fn plan_with_remainder() {
        let chunks = plan_chunks(40 * MIB, 32 * MIB);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 32 * MIB);
        assert_eq!(chunks[1].len(), 8 * MIB);
        assert!(chunks[1].is_final);
        assert_partition(&chunks, 40 * MIB);
    }

    #[test]
    fn plan_smaller_than_one_chunk() {
        let chunks = plan_chunks(10 * MIB, 32 * MIB);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].byte_end, 10 * MIB);
        assert!(chunks[0].is_final);
    }

    #[test]
    fn plan_empty_file_has_one_empty_chunk() {
        let chunks = plan_chunks(0, 32 * MIB);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
        assert!(chunks[0].is_final);
        assert_partition(&chunks, 0);
    }

    #[test]
    fn plan_zero_chunk_size_uses_default() {
        let chunks = plan_chunks(DEFAULT_CHUNK_SIZE + 1, 0);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn plan_partitions_many_sizes() {
        for chunk_size in [1u64, 3, 7, 16] {
            for file_size in 0u64..50 {
                let chunks = plan_chunks(file_size, chunk_size);
                let expected = if file_size == 0 {
                    1
                } else {
                    file_size.div_ceil(chunk_size)
                };
                assert_eq!(chunks.len() as u64, expected);
                assert_partition(&chunks, file_size);
            }
        }
    }

    #[test]
    fn reader_reads_planned_chunks() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"AABBCCDDEE");

        let mut reader = ChunkReader::open(&path).unwrap();
        assert_eq!(reader.file_size(), 10);

        let chunks = plan_chunks(10, 4);
        let data: Vec<Vec<u8>> = chunks
            .iter()
            .map(|c| reader.read_chunk(c).unwrap())
            .collect();
        assert_eq!(data, vec![b"AABB".to_vec(), b"CCDD".to_vec(), b"EE".to_vec()]);
    }

    #[test]
    fn reader_reads_out_of_order() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "test.bin", b"0123456789");

        let mut reader = ChunkReader::open(&path).unwrap();
        let chunks = plan_chunks(10, 4);
        assert_eq!(reader.read_chunk(&chunks[2]).unwrap(), b"89");
        assert_eq!(reader.read_chunk(&chunks[0]).unwrap(), b"0123");
    }

    #[test]
    fn reader_empty_chunk() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "empty.bin", b"");

        let mut reader = ChunkReader::open(&path).unwrap();
        let chunks = plan_chunks(0, 4);
        assert!(reader.read_chunk(&chunks[0]).unwrap().is_empty());
    }

    #[test]
    fn reader_rejects_chunk_past_end() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "short.bin", b"abc");

        let mut reader = ChunkReader::open(&path).unwrap();
        // Planned against a larger size than is on disk.
        let chunks = plan_chunks(8, 4);
        let err = reader.read_chunk(&chunks[0]).unwrap_err();
        assert!(matches!(
            err,
            TransferError::ChunkOutOfRange {
                index: 0,
                file_size: 3
            }
        ));
    }
}
