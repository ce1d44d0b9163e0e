use std::io::IsTerminal;
use std::path::Path;

use geminitts_core::events::TtsEvent;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// User-facing output. Everything is dropped when the tool streams audio to
/// standard output.
#[derive(Clone)]
pub struct Console {
    enabled: bool,
    use_colors: bool,
    bar: Option<ProgressBar>,
    merge: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            enabled: true,
            use_colors: std::io::stdout().is_terminal(),
            bar: None,
            merge: false,
        }
    }

    pub fn quiet() -> Self {
        Self {
            enabled: false,
            use_colors: false,
            bar: None,
            merge: false,
        }
    }

    /// Shows a progress bar over `len` lines. Messages printed through this
    /// console (or its clones) while the bar is live are drawn above it. In
    /// merge mode lines are labelled by number, since their files are
    /// temporary.
    pub fn start_progress(&mut self, len: u64, merge: bool) {
        self.merge = merge;
        let bar = if self.enabled {
            ProgressBar::new(len)
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} lines {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }

        self.bar = Some(bar);
    }

    pub fn finish_progress(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn line(&self, msg: String) {
        if !self.enabled {
            return;
        }
        match &self.bar {
            Some(bar) if !bar.is_hidden() => bar.println(msg),
            _ => println!("{msg}"),
        }
    }

    pub fn print_system(&self, msg: &str) {
        self.line(msg.to_string());
    }

    pub fn print_success(&self, msg: &str) {
        if self.use_colors {
            self.line(format!("\x1b[32m✅ {msg}\x1b[0m"));
        } else {
            self.line(format!("✅ {msg}"));
        }
    }

    pub fn print_warning(&self, msg: &str) {
        if self.use_colors {
            self.line(format!("\x1b[33m⚠️ {msg}\x1b[0m"));
        } else {
            self.line(format!("⚠️ {msg}"));
        }
    }

    pub fn print_error(&self, msg: &str) {
        if !self.enabled {
            return;
        }
        if let Some(bar) = &self.bar {
            bar.suspend(|| self.eprint_error(msg));
        } else {
            self.eprint_error(msg);
        }
    }

    fn eprint_error(&self, msg: &str) {
        if std::io::stderr().is_terminal() {
            eprintln!("\x1b[31m❌ Error:\x1b[0m {msg}");
        } else {
            eprintln!("❌ Error: {msg}");
        }
    }

    /// Renders pipeline events until every sender is dropped.
    pub fn spawn_event_renderer(
        self,
        mut event_rx: mpsc::UnboundedReceiver<TtsEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                self.render(event);
            }
        })
    }

    fn render(&self, event: TtsEvent) {
        match event {
            TtsEvent::LineStarted { .. } => {}
            TtsEvent::CacheHit { line: Some(line) } => {
                self.print_system(&format!("🗂️ Line {line}: using cached audio"));
            }
            TtsEvent::CacheHit { line: None } => {
                self.print_system("🗂️ Using cached audio");
            }
            TtsEvent::CacheReadFailed { .. } => {
                self.print_warning("Cached audio could not be read, regenerating");
            }
            TtsEvent::RetryAttempt {
                line,
                preview,
                attempt,
                max_attempts,
                error,
                delay,
            } => {
                let subject = match (line, preview) {
                    (Some(line), Some(preview)) => format!("Line {line} (\"{preview}\")"),
                    (Some(line), None) => format!("Line {line}"),
                    _ => "Request".to_string(),
                };
                let next = match delay {
                    Some(delay) => format!(", retrying in {}s", delay.as_secs_f32()),
                    None => String::new(),
                };
                self.print_warning(&format!(
                    "{subject}: attempt {attempt}/{max_attempts} failed: {error}{next}"
                ));
            }
            TtsEvent::LineCompleted { line, path, cached } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                    bar.set_message(progress_message(line, &path, cached, self.merge));
                }
            }
            TtsEvent::LineFailed {
                line,
                preview,
                error,
            } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                self.print_error(&format!("Line {line} (\"{preview}\") failed: {error}"));
            }
            TtsEvent::MergeStarted { sources, output } => {
                self.print_system(&format!("🔗 Merging {sources} files into {}", output.display()));
            }
            TtsEvent::FormatMismatch { sources } => {
                self.print_warning(&format!(
                    "Input files have different formats (sources {sources:?}). Using the first file's format for output."
                ));
            }
        }
    }
}

fn progress_message(line: usize, path: &Path, cached: bool, merge: bool) -> String {
    let label = if merge {
        format!("line {line}")
    } else {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    if cached {
        format!("{label} (cached)")
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_message_names_numbered_files() {
        let path = Path::new("out/output-03.wav");
        assert_eq!(progress_message(3, path, false, false), "output-03.wav");
        assert_eq!(progress_message(3, path, true, false), "output-03.wav (cached)");
    }

    #[test]
    fn test_progress_message_uses_line_number_when_merging() {
        let path = Path::new("/tmp/4f1c9a0e-7d2b-4c1e-9a5f-0b6d8e2c3a71.wav");
        assert_eq!(progress_message(7, path, false, true), "line 7");
        assert_eq!(progress_message(7, path, true, true), "line 7 (cached)");
    }
}
