//! Channel adapter for consuming upload progress on another task.

use tokio::sync::mpsc;

use crate::notifier::{Notice, Notifier};
use crate::progress::{BatchProgress, FileProgress, ProgressSink};

/// Event emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    FileProgress(FileProgress),
    BatchProgress(BatchProgress),
    Notice(Notice),
}

/// Forwards progress and notices into an mpsc channel.
///
/// Sinks are called synchronously from the request body stream, so the
/// channel is unbounded. Events sent after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: mpsc::UnboundedSender<UploadEvent>,
}

impl EventChannel {
    /// Creates the adapter and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for EventChannel {
    fn on_file_progress(&self, progress: &FileProgress) {
        self.emit(UploadEvent::FileProgress(progress.clone()));
    }

    fn on_batch_progress(&self, progress: &BatchProgress) {
        self.emit(UploadEvent::BatchProgress(progress.clone()));
    }
}

impl Notifier for EventChannel {
    fn notify(&self, notice: Notice) {
        self.emit(UploadEvent::Notice(notice));
    }
}
