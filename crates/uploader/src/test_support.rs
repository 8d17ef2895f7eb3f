//! Test doubles shared by the session and batch tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mediadrop_transfer::{ChecksumComputer, ChecksumFuture, TransferError, UploadTarget};
use tokio_util::sync::CancellationToken;

use crate::error::TransmitError;
use crate::notifier::{Notice, Notifier};
use crate::progress::{BatchProgress, FileProgress, ProgressSink};
use crate::transmitter::{Ack, ChunkMetadata, ChunkTransmitter, SendProgress, TransmitFuture};

pub(crate) struct SentChunk {
    pub metadata: ChunkMetadata,
    pub data: Vec<u8>,
}

/// Records every chunk and fails the ones it was told to.
#[derive(Default)]
pub(crate) struct MockTransmitter {
    sent: Mutex<Vec<SentChunk>>,
    failures: Mutex<HashMap<(String, u64), TransmitError>>,
    stalls: Mutex<HashSet<(String, u64)>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl MockTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, file_name: &str, chunk_index: u64, err: TransmitError) {
        self.failures
            .lock()
            .unwrap()
            .insert((file_name.to_string(), chunk_index), err);
    }

    /// Never answers this chunk.
    pub fn stall_on(&self, file_name: &str, chunk_index: u64) {
        self.stalls
            .lock()
            .unwrap()
            .insert((file_name.to_string(), chunk_index));
    }

    /// Cancels `token` once `calls` chunks have been sent.
    pub fn cancel_after(&self, calls: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((calls, token));
    }

    pub fn sent(&self) -> Vec<SentChunk> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| SentChunk {
                metadata: s.metadata.clone(),
                data: s.data.clone(),
            })
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn files_sent(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for s in self.sent.lock().unwrap().iter() {
            if names.last() != Some(&s.metadata.file_name) {
                names.push(s.metadata.file_name.clone());
            }
        }
        names
    }
}

impl ChunkTransmitter for MockTransmitter {
    fn send<'a>(
        &'a self,
        data: Vec<u8>,
        metadata: &'a ChunkMetadata,
        progress: SendProgress,
    ) -> TransmitFuture<'a> {
        Box::pin(async move {
            let len = data.len() as u64;
            let calls = {
                let mut sent = self.sent.lock().unwrap();
                sent.push(SentChunk {
                    metadata: metadata.clone(),
                    data,
                });
                sent.len()
            };

            let cancel = self.cancel_after.lock().unwrap().clone();
            if let Some((after, token)) = cancel
                && calls >= after
            {
                token.cancel();
            }

            let key = (metadata.file_name.clone(), metadata.chunk_index);
            let stalled = self.stalls.lock().unwrap().contains(&key);
            if stalled {
                std::future::pending::<()>().await;
            }

            let failure = self.failures.lock().unwrap().get(&key).cloned();
            match failure {
                Some(err) => Err(err),
                None => {
                    if len > 0 {
                        progress(len);
                    }
                    Ok(Ack::default())
                }
            }
        })
    }
}

/// Returns a fixed digest without reading the file.
pub(crate) struct CountingChecksum {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingChecksum {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChecksumComputer for CountingChecksum {
    fn compute<'a>(&'a self, path: &'a Path) -> ChecksumFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransferError::InvalidPath(path.display().to_string()));
            }
            Ok("ab".repeat(32))
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    files: Mutex<Vec<FileProgress>>,
    batches: Mutex<Vec<BatchProgress>>,
}

impl RecordingSink {
    pub fn files(&self) -> Vec<FileProgress> {
        self.files.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<BatchProgress> {
        self.batches.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_file_progress(&self, progress: &FileProgress) {
        self.files.lock().unwrap().push(progress.clone());
    }

    fn on_batch_progress(&self, progress: &BatchProgress) {
        self.batches.lock().unwrap().push(progress.clone());
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub(crate) fn write_file(
    dir: &Path,
    name: &str,
    contents: &[u8],
    destination: &str,
) -> UploadTarget {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    UploadTarget::from_path(&path, destination).unwrap()
}

/// Creates a file of `size` zero bytes without writing them.
pub(crate) fn write_sparse_file(
    dir: &Path,
    name: &str,
    size: u64,
    destination: &str,
) -> UploadTarget {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(size).unwrap();
    UploadTarget::from_path(&path, destination).unwrap()
}
