//! Terminal rendering of upload events.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mediadrop_uploader::{BatchProgress, FileProgress, Notice, NoticeLevel, UploadEvent};
use tokio::sync::mpsc;

const FILE_TEMPLATE: &str =
    "{msg:30} [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const BATCH_TEMPLATE: &str = "{msg:30} [{wide_bar:.green}] {percent:>3}%";

/// Two bars: the file being sent and the whole batch.
struct ProgressDisplay {
    multi: MultiProgress,
    file: ProgressBar,
    batch: ProgressBar,
}

impl ProgressDisplay {
    fn new() -> Self {
        let multi = MultiProgress::new();
        let file = multi.add(ProgressBar::new(0).with_style(style(FILE_TEMPLATE)));
        let batch = multi.add(ProgressBar::new(0).with_style(style(BATCH_TEMPLATE)));
        Self { multi, file, batch }
    }

    fn handle(&self, event: UploadEvent) {
        match event {
            UploadEvent::FileProgress(p) => {
                self.file.set_length(p.total_bytes);
                self.file.set_position(p.bytes_uploaded);
                self.file.set_message(file_label(&p));
            }
            UploadEvent::BatchProgress(p) => {
                self.batch.set_length(p.total_bytes);
                self.batch.set_position(p.displayed_bytes());
                self.batch.set_message(batch_label(&p));
            }
            UploadEvent::Notice(n) => {
                let _ = self.multi.println(notice_line(&n));
            }
        }
    }

    fn finish(&self) {
        self.file.finish_and_clear();
        self.batch.finish();
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Consumes events until every sender is gone.
pub async fn render(mut rx: mpsc::UnboundedReceiver<UploadEvent>) {
    let display = ProgressDisplay::new();
    while let Some(event) = rx.recv().await {
        display.handle(event);
    }
    display.finish();
}

fn file_label(p: &FileProgress) -> String {
    format!("[{}/{}] {}", p.file_index + 1, p.file_count, p.file_name)
}

fn batch_label(p: &BatchProgress) -> String {
    format!("{}/{} files", p.files_finished(), p.file_count)
}

fn notice_line(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "done",
        NoticeLevel::Error => "error",
    };
    format!("{tag}: {}", notice.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        let file = FileProgress {
            file_name: "ep1.mkv".into(),
            file_index: 1,
            file_count: 3,
            chunk_index: 0,
            total_chunks: 2,
            bytes_uploaded: 10,
            total_bytes: 20,
        };
        assert_eq!(file_label(&file), "[2/3] ep1.mkv");

        let mut batch = BatchProgress::new(3, 100);
        batch.files_succeeded = 1;
        batch.files_skipped = 1;
        assert_eq!(batch_label(&batch), "2/3 files");
    }

    #[test]
    fn notice_lines() {
        assert_eq!(
            notice_line(&Notice::error("Failed to upload a: b. Skipping this file.")),
            "error: Failed to upload a: b. Skipping this file."
        );
        assert_eq!(notice_line(&Notice::success("ok")), "done: ok");
    }

    #[test]
    fn templates_parse() {
        assert!(ProgressStyle::with_template(FILE_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(BATCH_TEMPLATE).is_ok());
    }

    #[tokio::test]
    async fn render_ends_when_senders_drop() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(UploadEvent::BatchProgress(BatchProgress::new(1, 10)))
            .unwrap();
        drop(tx);
        render(rx).await;
    }
}
