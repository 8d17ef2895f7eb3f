//! Upload session for a single file.
//!
//! A session hashes the file once, then sends its chunks strictly in
//! order until every chunk is acknowledged or one fails. Sessions are
//! single-use: `run` consumes the session and always returns a report
//! in a terminal state.

use std::path::Path;
use std::sync::Arc;

use mediadrop_transfer::{
    ChecksumComputer, ChunkDescriptor, ChunkReader, DEFAULT_CHUNK_SIZE, Sha256Checksum,
    UploadTarget, plan_chunks,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransmitError;
use crate::progress::{BatchProgress, FileProgress, NoopProgress, ProgressSink};
use crate::transmitter::{ChunkMetadata, ChunkTransmitter, SendProgress};

/// Lifecycle of a file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Hashing,
    Sending { chunk_index: u64 },
    Completed,
    Aborted(AbortReason),
}

impl SessionState {
    /// `true` for `Completed` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted(_))
    }
}

/// Why a file was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("could not compute checksum: {0}")]
    ChecksumFailed(String),

    #[error("could not read file: {0}")]
    ReadFailed(String),

    #[error("{0}")]
    TransmitFailed(TransmitError),

    #[error("upload cancelled")]
    Cancelled,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub file_name: String,
    /// Always terminal.
    pub state: SessionState,
    /// Token shared by every chunk request of this upload attempt.
    pub upload_id: Option<String>,
    pub checksum: Option<String>,
    pub chunks_sent: u64,
    pub total_chunks: u64,
    /// Bytes of chunks the server acknowledged.
    pub bytes_acknowledged: u64,
}

impl SessionReport {
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// The abort reason, if the file was abandoned.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.state {
            SessionState::Aborted(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Collaborators shared by every session of a batch.
#[derive(Clone)]
pub struct SessionContext {
    pub(crate) transmitter: Arc<dyn ChunkTransmitter>,
    pub(crate) checksum: Arc<dyn ChecksumComputer>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) chunk_size: u64,
    pub(crate) cancel: CancellationToken,
}

impl SessionContext {
    /// SHA-256 checksums, 32 MiB chunks, no progress reporting.
    pub fn new(transmitter: Arc<dyn ChunkTransmitter>) -> Self {
        Self {
            transmitter,
            checksum: Arc::new(Sha256Checksum),
            progress: Arc::new(NoopProgress),
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_checksum(mut self, checksum: Arc<dyn ChecksumComputer>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Sets the chunk size in bytes; 0 selects the default.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Drives one file from `Pending` to `Completed` or `Aborted`.
pub struct FileUploadSession {
    target: UploadTarget,
    ctx: SessionContext,
    state: SessionState,
    upload_id: Option<String>,
    checksum: Option<String>,
    total_chunks: u64,
    current_chunk_index: u64,
    bytes_uploaded: u64,
}

impl FileUploadSession {
    pub fn new(target: UploadTarget, ctx: SessionContext) -> Self {
        Self {
            target,
            ctx,
            state: SessionState::Pending,
            upload_id: None,
            checksum: None,
            total_chunks: 0,
            current_chunk_index: 0,
            bytes_uploaded: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    /// Runs the session to a terminal state.
    ///
    /// `batch` is the coordinator's committed progress; it is only used
    /// to build the snapshots handed to the progress sink.
    pub async fn run(mut self, batch: &BatchProgress) -> SessionReport {
        let terminal = match self.drive(batch).await {
            Ok(()) => SessionState::Completed,
            Err(reason) => SessionState::Aborted(reason),
        };
        self.transition(terminal);

        match &self.state {
            SessionState::Aborted(reason) => warn!(
                file = %self.target.file_name,
                chunk = self.current_chunk_index,
                total_chunks = self.total_chunks,
                reason = %reason,
                "upload abandoned"
            ),
            _ => info!(
                file = %self.target.file_name,
                bytes = self.bytes_uploaded,
                total_chunks = self.total_chunks,
                "upload completed"
            ),
        }

        SessionReport {
            file_name: self.target.file_name,
            state: self.state,
            upload_id: self.upload_id,
            checksum: self.checksum,
            chunks_sent: self.current_chunk_index,
            total_chunks: self.total_chunks,
            bytes_acknowledged: self.bytes_uploaded,
        }
    }

    async fn drive(&mut self, batch: &BatchProgress) -> Result<(), AbortReason> {
        self.check_cancelled()?;
        self.transition(SessionState::Hashing);

        let checksum = self
            .ctx
            .checksum
            .compute(&self.target.path)
            .await
            .map_err(|e| AbortReason::ChecksumFailed(e.to_string()))?;

        let chunks = plan_chunks(self.target.size_bytes, self.ctx.chunk_size);
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.total_chunks = chunks.len() as u64;
        self.checksum = Some(checksum.clone());
        self.upload_id = Some(upload_id.clone());

        debug!(
            file = %self.target.file_name,
            checksum = %checksum,
            upload_id = %upload_id,
            total_chunks = self.total_chunks,
            "checksum computed"
        );

        let mut reader = open_reader(&self.target.path).await?;
        if reader.file_size() != self.target.size_bytes {
            return Err(AbortReason::ReadFailed(format!(
                "file changed since it was selected: expected {} bytes, found {}",
                self.target.size_bytes,
                reader.file_size()
            )));
        }
        let mut metadata = ChunkMetadata {
            file_name: self.target.file_name.clone(),
            checksum,
            chunk_index: 0,
            total_chunks: self.total_chunks,
            destination_directory: self.target.destination_directory.clone(),
            upload_id,
        };

        for chunk in &chunks {
            self.check_cancelled()?;
            self.transition(SessionState::Sending {
                chunk_index: chunk.index,
            });

            let (r, data) = read_chunk(reader, *chunk).await?;
            reader = r;

            metadata.chunk_index = chunk.index;
            let progress = self.send_progress(chunk, batch);
            // A stalled request must not outlive cancellation.
            let sent = tokio::select! {
                biased;
                sent = self.ctx.transmitter.send(data, &metadata, progress) => sent,
                _ = self.ctx.cancel.cancelled() => return Err(AbortReason::Cancelled),
            };
            sent.map_err(AbortReason::TransmitFailed)?;

            self.bytes_uploaded += chunk.len();
            self.current_chunk_index = chunk.index + 1;

            let file = self.file_progress(chunk.index, self.bytes_uploaded, batch);
            self.ctx.progress.on_file_progress(&file);
            self.ctx
                .progress
                .on_batch_progress(&batch.with_in_flight(self.bytes_uploaded));
        }

        Ok(())
    }

    /// Builds the callback the transmitter reports request bytes through.
    fn send_progress(&self, chunk: &ChunkDescriptor, batch: &BatchProgress) -> SendProgress {
        let sink = Arc::clone(&self.ctx.progress);
        let base = self.file_progress(chunk.index, self.bytes_uploaded, batch);
        let batch = batch.clone();
        let prior = self.bytes_uploaded;
        let chunk_len = chunk.len();

        Arc::new(move |sent: u64| {
            let file_bytes = prior + sent.min(chunk_len);
            let file = FileProgress {
                bytes_uploaded: file_bytes,
                ..base.clone()
            };
            sink.on_file_progress(&file);
            sink.on_batch_progress(&batch.with_in_flight(file_bytes));
        })
    }

    fn file_progress(&self, chunk_index: u64, bytes: u64, batch: &BatchProgress) -> FileProgress {
        FileProgress {
            file_name: self.target.file_name.clone(),
            file_index: batch.files_finished(),
            file_count: batch.file_count,
            chunk_index,
            total_chunks: self.total_chunks,
            bytes_uploaded: bytes,
            total_bytes: self.target.size_bytes,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(file = %self.target.file_name, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }

    fn check_cancelled(&self) -> Result<(), AbortReason> {
        if self.ctx.cancel.is_cancelled() {
            Err(AbortReason::Cancelled)
        } else {
            Ok(())
        }
    }
}

async fn open_reader(path: &Path) -> Result<ChunkReader, AbortReason> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || ChunkReader::open(&path))
        .await
        .map_err(|e| AbortReason::ReadFailed(e.to_string()))?
        .map_err(|e| AbortReason::ReadFailed(e.to_string()))
}

/// Reads one chunk on the blocking pool, handing the reader back.
async fn read_chunk(
    mut reader: ChunkReader,
    chunk: ChunkDescriptor,
) -> Result<(ChunkReader, Vec<u8>), AbortReason> {
    tokio::task::spawn_blocking(move || {
        let data = reader.read_chunk(&chunk)?;
        Ok::<_, mediadrop_transfer::TransferError>((reader, data))
    })
    .await
    .map_err(|e| AbortReason::ReadFailed(e.to_string()))?
    .map_err(|e| AbortReason::ReadFailed(e.to_string()))
}
