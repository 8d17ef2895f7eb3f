//! Chunked HTTP upload flow.
//!
//! A [`BatchUploadCoordinator`] validates a batch of files against size
//! limits, then runs one [`FileUploadSession`] per file, strictly in
//! order. Each session hashes its file once and sends it to the server's
//! `/upload_chunk` endpoint as a series of multipart requests through a
//! [`ChunkTransmitter`]. A failed chunk abandons that file only.

pub mod batch;
pub mod error;
pub mod events;
pub mod notifier;
pub mod progress;
pub mod session;
pub mod transmitter;

#[cfg(test)]
mod test_support;

pub use batch::{BatchSummary, BatchUploadCoordinator, UploadLimits, validate_batch};
pub use error::{NETWORK_FAILURE_MESSAGE, TransmitError, UploadError, ValidationError};
pub use events::{EventChannel, UploadEvent};
pub use notifier::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use progress::{BatchProgress, FileProgress, NoopProgress, ProgressSink};
pub use session::{AbortReason, FileUploadSession, SessionContext, SessionReport, SessionState};
pub use transmitter::{
    Ack, ChunkMetadata, ChunkTransmitter, DEFAULT_CHUNK_TIMEOUT, HttpTransmitter, SendProgress,
    TransmitFuture, TransmitterConfig,
};

pub use mediadrop_transfer::{DEFAULT_CHUNK_SIZE, UploadTarget};
