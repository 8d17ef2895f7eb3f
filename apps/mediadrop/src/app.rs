//! Runs one batch upload from the command line.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use mediadrop_uploader::{
    BatchSummary, BatchUploadCoordinator, EventChannel, HttpTransmitter, UploadTarget,
    ValidationError,
};
use tracing::{info, warn};

use crate::Cli;
use crate::config::Config;
use crate::display;

/// Exit status when the batch is rejected before upload.
const EXIT_REJECTED: u8 = 2;
/// Exit status when at least one file was skipped.
const EXIT_PARTIAL: u8 = 1;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let directory = config
        .default_directory
        .clone()
        .context("no destination directory: pass --directory or set default_directory")?;

    let targets = cli
        .files
        .iter()
        .map(|path| {
            UploadTarget::from_path(path, &directory)
                .with_context(|| format!("cannot upload {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let transmitter = HttpTransmitter::new(config.transmitter_config())?;
    let (events, rx) = EventChannel::new();
    let events = Arc::new(events);

    let mut coordinator = BatchUploadCoordinator::new(Arc::new(transmitter))
        .with_chunk_size(config.chunk_size_bytes())
        .with_progress_sink(events.clone())
        .with_notifier(events);

    let renderer = tokio::spawn(display::render(rx));

    let cancel = coordinator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling upload");
            cancel.cancel();
        }
    });

    let result = coordinator.submit(targets, &config.limits()).await;
    interrupt.abort();

    // Closes the event channel so the renderer drains and exits.
    drop(coordinator);
    renderer.await?;

    if let Ok(summary) = &result {
        info!(
            uploaded = summary.files_succeeded,
            skipped = summary.files_skipped,
            "batch done"
        );
    }
    Ok(ExitCode::from(exit_status(&result)))
}

/// Maps a batch outcome to the process exit status.
fn exit_status(result: &Result<BatchSummary, ValidationError>) -> u8 {
    match result {
        Ok(summary) if summary.files_skipped == 0 => 0,
        Ok(_) => EXIT_PARTIAL,
        Err(_) => EXIT_REJECTED,
    }
}
