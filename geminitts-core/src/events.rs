use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

/// Progress and diagnostics emitted by the pipeline. The CLI renders these;
/// library users may ignore them by dropping the receiver.
#[derive(Debug, Clone, PartialEq)]
pub enum TtsEvent {
    /// A batch line was picked up by a worker.
    LineStarted { line: usize, preview: String },
    /// Audio was served from the cache instead of the API.
    CacheHit { line: Option<usize> },
    /// A cached entry existed but could not be read.
    CacheReadFailed { line: Option<usize> },
    /// A generation attempt failed and will be retried (or not, when
    /// `delay` is `None`).
    RetryAttempt {
        line: Option<usize>,
        preview: Option<String>,
        attempt: u32,
        max_attempts: u32,
        error: String,
        delay: Option<Duration>,
    },
    LineCompleted {
        line: usize,
        path: PathBuf,
        cached: bool,
    },
    LineFailed {
        line: usize,
        preview: String,
        error: String,
    },
    MergeStarted { sources: usize, output: PathBuf },
    /// Concatenated sources did not all share the first source's format.
    FormatMismatch { sources: Vec<usize> },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    event_tx: Option<mpsc::UnboundedSender<TtsEvent>>,
}

impl EventSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TtsEvent>) {
        let (event_tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                event_tx: Some(event_tx),
            },
            rx,
        )
    }

    /// A sender that discards every event.
    pub fn silent() -> Self {
        Self { event_tx: None }
    }

    pub fn send(&self, event: TtsEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
