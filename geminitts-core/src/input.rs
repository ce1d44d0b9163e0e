//! Turning command-line input into text lines.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ConfigError;

const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md"];
pub const PREVIEW_CHARS: usize = 30;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No valid text lines found in file {0:?}.")]
    NoUsableLines(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A single piece of text.
    Text(String),
    /// A `.txt` / `.md` file processed line by line.
    File(PathBuf),
}

/// Picks the input from `--text` / `--file`. A `--text` value starting with
/// `@` is treated as a file reference (see [`parse_file_reference`]).
pub fn resolve_input(text: Option<&str>, file: Option<&Path>) -> Result<InputSource, ConfigError> {
    let text = text.filter(|t| !t.is_empty());
    let file = file.filter(|f| !f.as_os_str().is_empty());

    let source = match (text, file) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingInput),
        (None, None) => return Err(ConfigError::MissingInput),
        (None, Some(file)) => InputSource::File(file.to_path_buf()),
        (Some(text), None) => match parse_file_reference(text) {
            Some(path) => InputSource::File(path),
            None => InputSource::Text(text.to_string()),
        },
    };

    if let InputSource::File(path) = &source {
        validate_extension(path)?;
    }

    Ok(source)
}

/// `@notes.txt`, `"@notes.txt"` and `@"my notes.txt"` all name the file
/// `notes.txt` / `my notes.txt`. Matching surrounding quotes are removed,
/// then one leading `@`, then matching quotes again.
pub fn parse_file_reference(text: &str) -> Option<PathBuf> {
    let unquoted = strip_matching_quotes(text.trim());
    let reference = unquoted.strip_prefix('@')?;
    let path = strip_matching_quotes(reference);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

fn strip_matching_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn validate_extension(path: &Path) -> Result<(), ConfigError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else if extension.is_empty() {
        Err(ConfigError::InvalidExtension("(none)".to_string()))
    } else {
        Err(ConfigError::InvalidExtension(format!(".{extension}")))
    }
}

/// Reads `path` and keeps the lines worth speaking.
pub fn read_lines(path: &Path) -> Result<Vec<String>, InputError> {
    if !path.is_file() {
        return Err(InputError::FileNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let lines = filter_lines(contents.lines());
    if lines.is_empty() {
        return Err(InputError::NoUsableLines(path.to_path_buf()));
    }
    Ok(lines)
}

/// Drops blank lines and lines without a single letter or digit.
pub fn filter_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| line.chars().any(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}

/// The prompt sent to the API is `"<instructions>: <text>"`, so colons are
/// removed from the instructions.
pub fn sanitize_instructions(instructions: &str) -> String {
    instructions.replace(':', "")
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}
