//! Per-file and per-batch progress state.

/// Receives progress while a batch is running.
///
/// Called from inside the request body stream, so implementations must
/// be cheap and must not block.
pub trait ProgressSink: Send + Sync {
    /// Progress of the file currently being sent.
    fn on_file_progress(&self, progress: &FileProgress);

    /// Progress of the whole batch, including bytes in flight.
    fn on_batch_progress(&self, progress: &BatchProgress);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_file_progress(&self, _progress: &FileProgress) {}
    fn on_batch_progress(&self, _progress: &BatchProgress) {}
}

/// Byte progress of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProgress {
    pub file_name: String,
    /// 0-based position of the file within its batch.
    pub file_index: usize,
    pub file_count: usize,
    /// Chunk currently being sent (or just acknowledged).
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

impl FileProgress {
    /// Completion percentage, rounded and clamped to 100.
    pub fn percent(&self) -> u8 {
        percent(self.bytes_uploaded, self.total_bytes)
    }
}

/// Aggregate counters for one batch submission.
///
/// Owned by the coordinator and reset at the start of every batch.
/// `bytes_uploaded` and the file counters change only when a file
/// session ends; `in_flight_bytes` is the live byte count of the file
/// currently being sent and is only set on snapshots handed to sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub file_count: usize,
    pub total_bytes: u64,
    pub bytes_uploaded: u64,
    pub in_flight_bytes: u64,
    pub files_succeeded: usize,
    pub files_skipped: usize,
}

impl BatchProgress {
    /// Fresh counters for a batch of `file_count` files.
    pub fn new(file_count: usize, total_bytes: u64) -> Self {
        Self {
            file_count,
            total_bytes,
            ..Self::default()
        }
    }

    /// Records a completed file. Its full size is counted once.
    pub(crate) fn record_completed(&mut self, size_bytes: u64) {
        self.commit_bytes(size_bytes);
        self.files_succeeded += 1;
    }

    /// Records an abandoned file. Bytes of chunks the server already
    /// acknowledged stay counted.
    pub(crate) fn record_skipped(&mut self, acknowledged_bytes: u64) {
        self.commit_bytes(acknowledged_bytes);
        self.files_skipped += 1;
    }

    fn commit_bytes(&mut self, bytes: u64) {
        self.bytes_uploaded = self
            .bytes_uploaded
            .saturating_add(bytes)
            .min(self.total_bytes);
        self.in_flight_bytes = 0;
    }

    /// Snapshot with `bytes` of the current file in flight.
    pub(crate) fn with_in_flight(&self, bytes: u64) -> Self {
        Self {
            in_flight_bytes: bytes,
            ..self.clone()
        }
    }

    /// Files that reached a terminal state.
    pub fn files_finished(&self) -> usize {
        self.files_succeeded + self.files_skipped
    }

    /// Committed plus in-flight bytes, never more than the batch total.
    pub fn displayed_bytes(&self) -> u64 {
        self.bytes_uploaded
            .saturating_add(self.in_flight_bytes)
            .min(self.total_bytes)
    }

    /// Overall completion percentage, rounded and clamped to 100.
    pub fn percent(&self) -> u8 {
        percent(self.displayed_bytes(), self.total_bytes)
    }
}

/// Rounded percentage; an empty total counts as done.
fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = done.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 4), 75);
        assert_eq!(percent(300, 200), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn file_percent() {
        let p = FileProgress {
            file_name: "a.mkv".into(),
            file_index: 0,
            file_count: 1,
            chunk_index: 0,
            total_chunks: 4,
            bytes_uploaded: 25,
            total_bytes: 100,
        };
        assert_eq!(p.percent(), 25);
    }

    #[test]
    fn batch_counters() {
        let mut batch = BatchProgress::new(3, 100);
        batch.record_completed(40);
        batch.record_skipped(10);
        assert_eq!(batch.bytes_uploaded, 50);
        assert_eq!(batch.files_succeeded, 1);
        assert_eq!(batch.files_skipped, 1);
        assert_eq!(batch.files_finished(), 2);
        assert_eq!(batch.percent(), 50);
    }

    #[test]
    fn bytes_never_exceed_total() {
        let mut batch = BatchProgress::new(1, 10);
        batch.record_completed(25);
        assert_eq!(batch.bytes_uploaded, 10);

        let snapshot = BatchProgress::new(1, 10).with_in_flight(50);
        assert_eq!(snapshot.displayed_bytes(), 10);
        assert_eq!(snapshot.percent(), 100);
    }

    #[test]
    fn in_flight_snapshot_leaves_counters() {
        let mut batch = BatchProgress::new(2, 100);
        batch.record_completed(30);
        let snapshot = batch.with_in_flight(20);
        assert_eq!(snapshot.displayed_bytes(), 50);
        assert_eq!(snapshot.bytes_uploaded, 30);
        assert_eq!(batch.in_flight_bytes, 0);
    }
}
