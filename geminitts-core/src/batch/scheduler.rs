use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::naming::{numbered_filename, temp_wav_path};
use crate::audio::{concat_files, AudioError, ConcatSummary};
use crate::events::{EventSender, TtsEvent};
use crate::input::{text_preview, PREVIEW_CHARS};
use crate::tts::{LineContext, TtsClient, TtsRequest};

/// Lines sharing one voice and one set of instructions.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub lines: Vec<String>,
    pub instructions: String,
    pub voice: String,
    /// Maximum number of lines generated at the same time.
    pub concurrency: usize,
    /// Concatenate every line into `output` instead of writing numbered files.
    pub merge: bool,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    PartiallyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Completed {
        line: usize,
        /// The numbered file, or in merge mode the (since removed) temporary
        /// file the line was written to.
        path: PathBuf,
        cached: bool,
    },
    Failed {
        line: usize,
        preview: String,
        error: String,
    },
}

impl LineOutcome {
    pub fn line(&self) -> usize {
        match self {
            Self::Completed { line, .. } | Self::Failed { line, .. } => *line,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MergedOutput {
    pub path: PathBuf,
    pub summary: ConcatSummary,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub state: JobState,
    /// One outcome per input line, in input order.
    pub lines: Vec<LineOutcome>,
    pub merged: Option<MergedOutput>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.lines.iter().filter(|l| l.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.lines.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("batch has no lines to process")]
    EmptyJob,

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to merge generated audio: {0}")]
    Merge(#[from] AudioError),

    #[error("merge task failed: {0}")]
    MergeTask(String),
}

struct WorkItem {
    line: usize,
    text: String,
    target: PathBuf,
}

/// Fans a [`BatchJob`] out to a fixed pool of workers pulling lines from a
/// shared queue, then gathers the results back into input order.
pub struct BatchScheduler {
    client: Arc<TtsClient>,
    temp_dir: PathBuf,
}

impl BatchScheduler {
    pub fn new(client: Arc<TtsClient>) -> Self {
        Self {
            client,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Directory for per-line files in merge mode.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    fn events(&self) -> &EventSender {
        self.client.events()
    }

    pub async fn run(&self, job: BatchJob) -> Result<BatchReport, BatchError> {
        if job.lines.is_empty() {
            return Err(BatchError::EmptyJob);
        }
        if job.concurrency == 0 {
            return Err(BatchError::InvalidConcurrency);
        }

        let mut state = JobState::Pending;
        let targets = self.plan_targets(&job).await?;

        let workers = job.concurrency.min(job.lines.len());
        transition(&mut state, JobState::Running);
        info!(
            lines = job.lines.len(),
            workers,
            merge = job.merge,
            "Starting batch"
        );

        let outcomes = self.run_workers(&job, targets.clone(), workers).await;
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();

        let merged = if job.merge {
            self.finish_merge(&job.output, &outcomes, &targets, failed)
                .await?
        } else {
            None
        };

        let final_state = if failed == 0 {
            JobState::Completed
        } else {
            JobState::PartiallyFailed
        };
        transition(&mut state, final_state);

        Ok(BatchReport {
            state,
            lines: outcomes,
            merged,
        })
    }

    async fn plan_targets(&self, job: &BatchJob) -> Result<Vec<PathBuf>, BatchError> {
        // The merged output's directory must exist before any line is generated.
        let mut dirs = vec![job
            .output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()];
        if job.merge {
            dirs.push(self.temp_dir.clone());
        }

        for dir in dirs.iter().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| BatchError::OutputDir {
                    path: dir.clone(),
                    source,
                })?;
        }

        Ok((1..=job.lines.len())
            .map(|line| {
                if job.merge {
                    temp_wav_path(&self.temp_dir)
                } else {
                    numbered_filename(&job.output, line)
                }
            })
            .collect())
    }

    async fn run_workers(
        &self,
        job: &BatchJob,
        targets: Vec<PathBuf>,
        workers: usize,
    ) -> Vec<LineOutcome> {
        let (work_tx, work_rx) = async_channel::bounded::<WorkItem>(workers);
        let instructions: Arc<str> = Arc::from(job.instructions.as_str());
        let voice: Arc<str> = Arc::from(job.voice.as_str());

        let mut join_set: JoinSet<Vec<LineOutcome>> = JoinSet::new();
        for worker in 0..workers {
            let work_rx = work_rx.clone();
            let client = self.client.clone();
            let instructions = instructions.clone();
            let voice = voice.clone();

            join_set.spawn(async move {
                let mut outcomes = Vec::new();
                while let Ok(item) = work_rx.recv().await {
                    debug!(worker, line = item.line, "Worker picked up line");
                    let request = TtsRequest::new(&*instructions, &*voice, item.text.as_str());
                    outcomes.push(process_line(&client, request, item).await);
                }
                outcomes
            });
        }
        drop(work_rx);

        for (index, (text, target)) in job.lines.iter().zip(targets).enumerate() {
            let item = WorkItem {
                line: index + 1,
                text: text.clone(),
                target,
            };
            if work_tx.send(item).await.is_err() {
                error!("All batch workers exited before the queue was drained");
                break;
            }
        }
        work_tx.close();

        let mut slots: Vec<Option<LineOutcome>> = vec![None; job.lines.len()];
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        let slot = outcome.line() - 1;
                        slots[slot] = Some(outcome);
                    }
                }
                Err(e) => error!(error = %e, "Batch worker task failed"),
            }
        }

        slots
            .into_iter()
            .zip(&job.lines)
            .enumerate()
            .map(|(index, (slot, text))| {
                slot.unwrap_or_else(|| LineOutcome::Failed {
                    line: index + 1,
                    preview: text_preview(text, PREVIEW_CHARS),
                    error: "worker stopped before processing this line".to_string(),
                })
            })
            .collect()
    }

    /// Concatenates the per-line files when every line succeeded. Every
    /// planned temp file is removed afterwards, including ones left behind by
    /// a failed write.
    async fn finish_merge(
        &self,
        output: &Path,
        outcomes: &[LineOutcome],
        targets: &[PathBuf],
        failed: usize,
    ) -> Result<Option<MergedOutput>, BatchError> {
        let temp_files: Vec<PathBuf> = outcomes
            .iter()
            .filter_map(|o| match o {
                LineOutcome::Completed { path, .. } => Some(path.clone()),
                LineOutcome::Failed { .. } => None,
            })
            .collect();

        let result = if failed > 0 {
            warn!(
                failed,
                "Skipping merge because some lines failed to generate"
            );
            Ok(None)
        } else {
            self.events().send(TtsEvent::MergeStarted {
                sources: temp_files.len(),
                output: output.to_path_buf(),
            });

            let inputs = temp_files.clone();
            let output = output.to_path_buf();
            tokio::task::spawn_blocking(move || {
                concat_files(&inputs, &output).map(|summary| MergedOutput {
                    path: output,
                    summary,
                })
            })
            .await
            .map_err(|e| BatchError::MergeTask(e.to_string()))
            .and_then(|r| r.map_err(BatchError::from))
            .map(Some)
        };

        for path in targets {
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!(?path, error = %e, "Ignoring failure to remove temporary file");
            }
        }

        if let Ok(Some(merged)) = &result {
            if !merged.summary.formats_match() {
                self.events().send(TtsEvent::FormatMismatch {
                    sources: merged.summary.mismatched.clone(),
                });
            }
            info!(output = ?merged.path, sources = merged.summary.sources, "Merged batch output");
        }

        result
    }
}

fn transition(state: &mut JobState, next: JobState) {
    debug!(from = ?state, to = ?next, "Batch state change");
    *state = next;
}

async fn process_line(client: &TtsClient, request: TtsRequest, item: WorkItem) -> LineOutcome {
    let context = LineContext {
        line: item.line,
        preview: text_preview(&item.text, PREVIEW_CHARS),
    };
    client.events().send(TtsEvent::LineStarted {
        line: item.line,
        preview: context.preview.clone(),
    });

    let result = match client.synthesize(&request, Some(&context)).await {
        Ok(synthesis) => tokio::fs::write(&item.target, &synthesis.wav)
            .await
            .map(|_| synthesis.from_cache)
            .map_err(|e| format!("failed to write {:?}: {e}", item.target)),
        Err(e) => Err(e.to_string()),
    };

    match result {
        Ok(cached) => {
            client.events().send(TtsEvent::LineCompleted {
                line: item.line,
                path: item.target.clone(),
                cached,
            });
            LineOutcome::Completed {
                line: item.line,
                path: item.target,
                cached,
            }
        }
        Err(error) => {
            warn!(line = item.line, %error, "Line failed");
            client.events().send(TtsEvent::LineFailed {
                line: item.line,
                preview: context.preview.clone(),
                error: error.clone(),
            });
            LineOutcome::Failed {
                line: item.line,
                preview: context.preview,
                error,
            }
        }
    }
}
