//! User-facing notices.

use tracing::{info, warn};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A message meant for the person running the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Delivers notices to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => warn!(notice = %notice.message, "upload notice"),
            NoticeLevel::Info | NoticeLevel::Success => {
                info!(notice = %notice.message, "upload notice")
            }
        }
    }
}

/// Text shown when a file is abandoned.
pub(crate) fn skipped_message(file_name: &str, reason: &impl std::fmt::Display) -> String {
    format!("Failed to upload {file_name}: {reason}. Skipping this file.")
}

/// Text shown when cancellation leaves files unsent.
pub(crate) fn cancelled_message(not_started: usize) -> String {
    format!("Upload cancelled. {not_started} file(s) were not started.")
}

/// Text shown when a batch finishes.
pub(crate) fn summary_message(succeeded: usize, skipped: usize) -> String {
    format!("Upload finished! {succeeded} file(s) uploaded, {skipped} file(s) skipped.")
}
