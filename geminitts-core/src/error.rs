use std::path::PathBuf;

use thiserror::Error;

/// Problems with how the tool was invoked or configured. These are always
/// detected before any request is sent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing API key. Please set the {0} environment variable.")]
    MissingApiKey(&'static str),

    #[error("Invalid voice '{0}'. Use the 'list-voices' command to see available voices.")]
    InvalidVoice(String),

    #[error("File must have .txt or .md extension. Found: {0}")]
    InvalidExtension(String),

    #[error("Either --text or --file option must be provided.")]
    MissingInput,

    #[error("Cannot specify both --text and --file options. Use one or the other.")]
    ConflictingInput,

    #[error("Batch processing cannot stream to standard output; use an output file name.")]
    StdoutBatch,

    #[error("Concurrency must be at least 1.")]
    InvalidConcurrency,

    #[error("Invalid settings file {path:?}: {message}")]
    InvalidSettings { path: PathBuf, message: String },
}
