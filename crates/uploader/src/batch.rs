//! Batch validation and sequential upload of many files.

use std::sync::Arc;

use mediadrop_transfer::{
    ChecksumComputer, TransferError, UploadTarget, validate_destination_directory,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::notifier::{
    Notice, Notifier, TracingNotifier, cancelled_message, skipped_message, summary_message,
};
use crate::progress::{BatchProgress, ProgressSink};
use crate::session::{FileUploadSession, SessionContext, SessionReport};
use crate::transmitter::ChunkTransmitter;

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

/// Size limits a batch is checked against before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub per_file_max_bytes: u64,
    pub total_max_bytes: u64,
}

impl UploadLimits {
    pub fn from_gib(per_file: u64, total: u64) -> Self {
        Self {
            per_file_max_bytes: per_file.saturating_mul(GIB),
            total_max_bytes: total.saturating_mul(GIB),
        }
    }

    pub fn from_mib(per_file: u64, total: u64) -> Self {
        Self {
            per_file_max_bytes: per_file.saturating_mul(MIB),
            total_max_bytes: total.saturating_mul(MIB),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            per_file_max_bytes: u64::MAX,
            total_max_bytes: u64::MAX,
        }
    }
}

impl Default for UploadLimits {
    /// 5 GiB per file, 20 GiB per batch.
    fn default() -> Self {
        Self::from_gib(5, 20)
    }
}

/// Checks a batch against `limits`, returning its total size.
///
/// All-or-nothing: one bad file rejects the whole batch.
pub fn validate_batch(
    files: &[UploadTarget],
    limits: &UploadLimits,
) -> Result<u64, ValidationError> {
    let mut total: u64 = 0;
    for file in files {
        validate_destination_directory(&file.destination_directory).map_err(|e| {
            ValidationError::InvalidDirectory(match e {
                TransferError::InvalidPath(msg) => msg,
                other => other.to_string(),
            })
        })?;

        if file.size_bytes > limits.per_file_max_bytes {
            return Err(ValidationError::FileTooLarge {
                file_name: file.file_name.clone(),
                size_bytes: file.size_bytes,
                limit_bytes: limits.per_file_max_bytes,
            });
        }
        total = total.saturating_add(file.size_bytes);
    }

    if total > limits.total_max_bytes {
        return Err(ValidationError::BatchTooLarge {
            total_bytes: total,
            limit_bytes: limits.total_max_bytes,
        });
    }
    Ok(total)
}

/// Result of a batch that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub files_succeeded: usize,
    pub files_skipped: usize,
    pub bytes_uploaded: u64,
    /// One report per file that was started, in submission order.
    pub reports: Vec<SessionReport>,
}

/// Uploads batches of files one at a time.
pub struct BatchUploadCoordinator {
    ctx: SessionContext,
    notifier: Arc<dyn Notifier>,
    progress: BatchProgress,
}

impl BatchUploadCoordinator {
    pub fn new(transmitter: Arc<dyn ChunkTransmitter>) -> Self {
        Self {
            ctx: SessionContext::new(transmitter),
            notifier: Arc::new(TracingNotifier),
            progress: BatchProgress::default(),
        }
    }

    pub fn with_checksum(mut self, checksum: Arc<dyn ChecksumComputer>) -> Self {
        self.ctx = self.ctx.with_checksum(checksum);
        self
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.ctx = self.ctx.with_progress(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.ctx = self.ctx.with_chunk_size(chunk_size);
        self
    }

    /// Token that stops the batch after the current chunk.
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.cancel_token()
    }

    /// Counters of the current or most recent batch.
    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    /// Validates and uploads `files` in order.
    ///
    /// A rejected batch sends nothing. Once validation passes, failures
    /// are per file: an abandoned file is reported to the notifier and
    /// the next file starts.
    pub async fn submit(
        &mut self,
        files: Vec<UploadTarget>,
        limits: &UploadLimits,
    ) -> Result<BatchSummary, ValidationError> {
        let total_bytes = match validate_batch(&files, limits) {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, files = files.len(), "batch rejected");
                self.notifier.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        self.progress = BatchProgress::new(files.len(), total_bytes);
        self.ctx.progress.on_batch_progress(&self.progress);
        info!(files = files.len(), total_bytes, "batch started");

        let cancel = self.ctx.cancel_token();
        let mut reports = Vec::with_capacity(files.len());
        let mut not_started = 0;

        for target in files {
            if cancel.is_cancelled() {
                self.progress.record_skipped(0);
                not_started += 1;
                continue;
            }

            let size_bytes = target.size_bytes;
            let session = FileUploadSession::new(target, self.ctx.clone());
            let report = session.run(&self.progress).await;
            debug_assert!(report.state.is_terminal());

            match report.abort_reason() {
                None => self.progress.record_completed(size_bytes),
                Some(reason) => {
                    self.progress.record_skipped(report.bytes_acknowledged);
                    self.notifier
                        .notify(Notice::error(skipped_message(&report.file_name, reason)));
                }
            }
            self.ctx.progress.on_batch_progress(&self.progress);
            reports.push(report);
        }

        if not_started > 0 {
            self.ctx.progress.on_batch_progress(&self.progress);
            self.notifier
                .notify(Notice::info(cancelled_message(not_started)));
        }

        let summary = BatchSummary {
            files_succeeded: self.progress.files_succeeded,
            files_skipped: self.progress.files_skipped,
            bytes_uploaded: self.progress.bytes_uploaded,
            reports,
        };
        info!(
            succeeded = summary.files_succeeded,
            skipped = summary.files_skipped,
            bytes = summary.bytes_uploaded,
            "batch finished"
        );
        self.notifier.notify(Notice::success(summary_message(
            summary.files_succeeded,
            summary.files_skipped,
        )));
        Ok(summary)
    }
}
