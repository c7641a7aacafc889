//! Where a run's results end up: the automation output file (or stdout) for
//! the digest, and a local file for the feed.
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        OutputError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Where the digest went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSink {
    AutomationFile,
    Console,
}

/// Picks a heredoc delimiter that does not appear as a line of `body`.
pub fn unique_delimiter(body: &str) -> String {
    let mut delimiter = "EOF".to_string();
    let mut n = 0u32;
    while body.lines().any(|line| line == delimiter) {
        n += 1;
        delimiter = format!("EOF_{n}");
    }
    delimiter
}

/// Renders the two output fields in `GITHUB_OUTPUT` syntax.
pub fn format_automation_output(title: &str, body: &str) -> String {
    let delimiter = unique_delimiter(body);
    // key=value lines cannot carry newlines
    let title = title.replace(['\r', '\n'], " ");
    format!("issue_title={title}\nissue_body<<{delimiter}\n{body}\n{delimiter}\n")
}

/// Appends the title and body to the automation output file.
pub fn append_automation_output(path: &Path, title: &str, body: &str) -> Result<(), OutputError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OutputError::io(path, e))?;

    file.write_all(format_automation_output(title, body).as_bytes())
        .map_err(|e| OutputError::io(path, e))?;
    Ok(())
}

/// Sends the digest to the automation file when one is configured, otherwise
/// prints a preview to stdout.
pub fn emit_digest(
    output_path: Option<&Path>,
    title: &str,
    body: &str,
) -> Result<DigestSink, OutputError> {
    match output_path {
        Some(path) => {
            append_automation_output(path, title, body)?;
            tracing::info!(path = %path.display(), "Output prepared for automation");
            Ok(DigestSink::AutomationFile)
        }
        None => {
            println!("\n--- DIGEST PREVIEW ---");
            println!("Title: {title}");
            println!("Body:\n{body}");
            Ok(DigestSink::Console)
        }
    }
}

/// Writes the feed document atomically. Empty content is not written.
///
/// Returns whether the file was written.
pub fn write_feed(path: &Path, content: &str) -> Result<bool, OutputError> {
    if content.trim().is_empty() {
        tracing::warn!(path = %path.display(), "Feed content is empty, not writing");
        return Ok(false);
    }
    atomic_write(path, content.as_bytes())?;
    tracing::info!(path = %path.display(), bytes = content.len(), "Feed written");
    Ok(true)
}

/// Write-to-temp-then-rename so the destination is never left half written.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    use std::time::{SystemTime, UNIX_EPOCH};

    // Randomized temp filename so a stale temp file never blocks the write
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| OutputError::io(&temp_path, e))?;

    if let Err(e) = file.write_all(content).and_then(|()| file.sync_all()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(OutputError::io(&temp_path, e));
    }
    drop(file);

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(OutputError::io(path, e));
        }
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        OutputError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_automation_output() {
        let out = format_automation_output("Weekly Concert Alert: 2024-01-01", "line 1\nline 2");
        assert_eq!(
            out,
            "issue_title=Weekly Concert Alert: 2024-01-01\nissue_body<<EOF\nline 1\nline 2\nEOF\n"
        );
    }

    #[test]
    fn test_delimiter_avoids_body_lines() {
        assert_eq!(unique_delimiter("nothing special"), "EOF");
        assert_eq!(unique_delimiter("a\nEOF\nb"), "EOF_1");
        assert_eq!(unique_delimiter("EOF\nEOF_1"), "EOF_2");
        // Only whole lines count
        assert_eq!(unique_delimiter("EOF is near"), "EOF");
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = std::env::temp_dir().join("tourwatch_output_test_append");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("github_output");
        std::fs::write(&path, "previous=1\n").unwrap();

        let sink = emit_digest(Some(path.as_path()), "Title", "Body").unwrap();
        assert_eq!(sink, DigestSink::AutomationFile);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "previous=1\nissue_title=Title\nissue_body<<EOF\nBody\nEOF\n"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_console_sink() {
        assert_eq!(emit_digest(None, "t", "b").unwrap(), DigestSink::Console);
    }

    #[test]
    fn test_write_feed_overwrites() {
        let dir = std::env::temp_dir().join("tourwatch_output_test_feed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nested").join("concerts.xml");

        assert!(write_feed(&path, "<rss>old</rss>").unwrap());
        assert!(write_feed(&path, "<rss>new</rss>").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<rss>new</rss>");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_feed_skips_empty() {
        let path = std::env::temp_dir().join("tourwatch_output_test_empty_feed.xml");
        std::fs::remove_file(&path).ok();

        assert!(!write_feed(&path, "  \n").unwrap());
        assert!(!path.exists());
    }
}
