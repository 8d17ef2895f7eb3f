use std::path::{Component, Path};

use crate::TransferError;

/// Checks a destination directory before any file is sent.
///
/// The server joins the directory onto its media root, so it has to be a
/// non-empty relative path that stays below that root.
pub fn validate_destination_directory(directory: &str) -> Result<(), TransferError> {
    let reject = |why: &str| -> Result<(), TransferError> {
        Err(TransferError::InvalidPath(format!("{why}: {directory:?}")))
    };

    if directory.trim().is_empty() {
        return reject("destination directory is empty");
    }
    if directory.chars().any(char::is_control) {
        return reject("control characters not allowed");
    }

    let path = Path::new(directory);
    if path.is_absolute() {
        return reject("absolute path not allowed");
    }

    let offending = path.components().find_map(|c| match c {
        Component::ParentDir => Some("parent directory traversal not allowed"),
        Component::RootDir => Some("absolute path not allowed"),
        Component::Prefix(_) => Some("drive or UNC prefix not allowed"),
        Component::CurDir | Component::Normal(_) => None,
    });
    match offending {
        Some(why) => reject(why),
        None => Ok(()),
    }
}
