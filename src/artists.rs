use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading the artist list.
#[derive(Debug, Error)]
pub enum ArtistsError {
    /// The list file does not exist. Fatal: the run aborts before any request.
    #[error("Artist list not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read artist list: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads a newline-delimited artist list from disk.
///
/// Lines are trimmed and blank lines skipped. Order is preserved and
/// duplicates are kept, so the digest follows the file.
pub async fn load(path: &Path) -> Result<Vec<String>, ArtistsError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtistsError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(ArtistsError::Io(e)),
    };

    let artists = parse_artists(&content);
    tracing::debug!(path = %path.display(), count = artists.len(), "Loaded artist list");
    Ok(artists)
}

/// Splits list content into artist names.
pub fn parse_artists(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
