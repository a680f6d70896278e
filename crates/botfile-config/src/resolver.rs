//! Document path resolution

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{BotFileError, Result};

/// File extension of bot documents
pub const BOT_FILE_EXTENSION: &str = "bot";

/// Pick the document to operate on
///
/// An explicit path is used verbatim. Otherwise `dir` must contain exactly
/// one `.bot` file.
pub fn resolve_document_path(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BotFileError::io(dir, e))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == BOT_FILE_EXTENSION)
        })
        .collect();

    match candidates.len() {
        0 => Err(BotFileError::ConfigNotFound(dir.to_path_buf())),
        1 => {
            let path = candidates.remove(0);
            debug!(path = %path.display(), "discovered bot file");
            Ok(path)
        }
        count => Err(BotFileError::AmbiguousConfig {
            dir: dir.to_path_buf(),
            count,
        }),
    }
}
