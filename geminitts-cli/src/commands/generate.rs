use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use geminitts_core::{
    batch::{BatchJob, BatchScheduler, LineOutcome},
    error::ConfigError,
    events::EventSender,
    input::{read_lines, resolve_input, sanitize_instructions, InputSource},
    settings::{api_key_from_env, Settings, SettingsManager},
    tts::{GeminiTransport, TtsClient, TtsRequest},
    voice::VoiceCatalog,
};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::info;

use crate::console::Console;

pub const STDOUT_MARKER: &str = "-";

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Text to convert to speech, or @file to read lines from a file
    #[arg(short = 't', long)]
    pub text: Option<String>,

    /// .txt or .md file to process line by line
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Instructions for how the text should be spoken
    #[arg(short = 'i', long)]
    pub instructions: Option<String>,

    /// Voice name (random if not specified, see `list-voices`)
    #[arg(short = 's', long = "speaker1")]
    pub speaker: Option<String>,

    /// Output WAV file, or `-` to stream a single result to stdout
    #[arg(short = 'o', long = "outputfile", default_value = "output.wav")]
    pub output: String,

    /// Concurrent API requests for batch processing
    #[arg(short = 'c', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Merge all batch outputs into the output file
    #[arg(short = 'm', long)]
    pub merge: bool,

    /// Skip the audio cache and always call the API
    #[arg(long)]
    pub no_cache: bool,

    /// Settings file (defaults to ~/.geminitts/settings.toml)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn streams_to_stdout(&self) -> bool {
        self.output == STDOUT_MARKER
    }
}

pub async fn run(args: GenerateArgs, mut console: Console) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;

    let instructions = sanitize_instructions(
        args.instructions
            .as_deref()
            .unwrap_or(&settings.default_instructions),
    );

    let catalog = VoiceCatalog::gemini();
    let voice = select_voice(&catalog, args.speaker.as_deref())?;

    let source = resolve_input(args.text.as_deref(), args.file.as_deref())?;

    if args.concurrency == 0 {
        return Err(ConfigError::InvalidConcurrency.into());
    }

    match source {
        InputSource::Text(text) => {
            if args.merge {
                console.print_warning("--merge only applies to batch processing; ignoring it.");
            }
            let api_key = api_key_from_env()?;

            let category = catalog
                .category_of(&voice)
                .map(|c| c.to_string())
                .unwrap_or_default();
            console.print_system(&format!("📜 Instructions: {instructions}"));
            console.print_system(&format!("🎤 Select voice: {voice} ({category})"));
            console.print_system(&format!("📝 The TTS Text: {text}"));
            print_cache_mode(&console, args.no_cache);

            let (client, renderer) = build_client(&settings, api_key, args.no_cache, &console)?;
            let request = TtsRequest::new(instructions, voice, text);
            run_single(client, renderer, &request, &args.output, &console).await
        }
        InputSource::File(path) => {
            if args.streams_to_stdout() {
                return Err(ConfigError::StdoutBatch.into());
            }
            let lines = read_lines(&path)?;
            let api_key = api_key_from_env()?;

            console.print_system(&format!("📁 Processing file: {}", path.display()));
            console.print_system(&format!("📝 Found {} valid text lines", lines.len()));
            console.print_system(&format!("🎤 Using voice: {voice}"));
            console.print_system(&format!("⚡ Concurrency level: {}", args.concurrency));
            console.print_system(&format!(
                "🔗 Merge mode: {}",
                if args.merge { "Yes" } else { "No" }
            ));
            print_cache_mode(&console, args.no_cache);

            let job = BatchJob {
                lines,
                instructions,
                voice,
                concurrency: args.concurrency,
                merge: args.merge,
                output: PathBuf::from(&args.output),
            };
            run_batch(&settings, api_key, args.no_cache, job, &mut console).await
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let manager = match path {
        Some(path) => SettingsManager::from_path(path.to_path_buf()),
        None => SettingsManager::new(),
    }
    .context("Failed to load settings")?;

    info!(path = ?manager.path(), "Loaded settings");
    Ok(manager.settings().clone())
}

fn select_voice(catalog: &VoiceCatalog, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(voice) if catalog.is_valid(voice) => Ok(voice.to_string()),
        Some(voice) => Err(ConfigError::InvalidVoice(voice.to_string()).into()),
        None => catalog
            .pick_random()
            .map(str::to_string)
            .context("Voice catalog is empty"),
    }
}

fn print_cache_mode(console: &Console, no_cache: bool) {
    console.print_system(&format!(
        "🗂️ Cache mode: {}",
        if no_cache { "Disabled" } else { "Enabled" }
    ));
}

/// The client plus the task rendering its events. The renderer stops once
/// the client (and every clone of its event sender) is dropped.
fn build_client(
    settings: &Settings,
    api_key: String,
    no_cache: bool,
    console: &Console,
) -> Result<(TtsClient, JoinHandle<()>)> {
    let transport = GeminiTransport::new(settings.gemini_config(api_key))
        .context("Failed to create HTTP client")?;
    let (events, event_rx) = EventSender::new();
    let renderer = console.clone().spawn_event_renderer(event_rx);

    let client = TtsClient::new(Arc::new(transport), settings.cache_store(!no_cache))
        .with_retry_policy(settings.retry_policy())
        .with_events(events);
    Ok((client, renderer))
}

async fn run_single(
    client: TtsClient,
    renderer: JoinHandle<()>,
    request: &TtsRequest,
    output: &str,
    console: &Console,
) -> Result<()> {
    let result = client.synthesize(request, None).await;
    drop(client);
    let _ = renderer.await;

    let synthesis = result.context("Failed to generate audio")?;

    if output == STDOUT_MARKER {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(&synthesis.wav)
            .await
            .context("Failed to write audio to stdout")?;
        stdout.flush().await?;
        return Ok(());
    }

    tokio::fs::write(output, &synthesis.wav)
        .await
        .with_context(|| format!("Failed to write {output}"))?;

    let note = if synthesis.from_cache { " (from cache)" } else { "" };
    console.print_success(&format!("Generated {output}{note}"));
    Ok(())
}

async fn run_batch(
    settings: &Settings,
    api_key: String,
    no_cache: bool,
    job: BatchJob,
    console: &mut Console,
) -> Result<()> {
    let total = job.lines.len();
    let merge = job.merge;
    console.start_progress(total as u64, merge);

    let (client, renderer) = build_client(settings, api_key, no_cache, console)?;
    let scheduler = BatchScheduler::new(Arc::new(client));
    let result = scheduler.run(job).await;
    drop(scheduler);
    let _ = renderer.await;
    console.finish_progress();

    let report = result.context("Batch processing failed")?;

    if !merge {
        for outcome in &report.lines {
            if let LineOutcome::Completed { path, cached, .. } = outcome {
                let note = if *cached { " (from cache)" } else { "" };
                console.print_success(&format!("Generated {}{note}", path.display()));
            }
        }
    }

    if let Some(merged) = &report.merged {
        console.print_success(&format!("Generated merged file: {}", merged.path.display()));
    }

    if !report.is_success() {
        if merge {
            console.print_warning("Merge skipped because some lines failed. Rerun to retry them.");
        }
        bail!("{} of {} lines failed to generate", report.failed(), total);
    }

    console.print_success(&format!("Batch processing completed: {total} lines"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_voice() {
        let catalog = VoiceCatalog::gemini();

        assert_eq!(select_voice(&catalog, Some("Zephyr")).unwrap(), "Zephyr");

        let err = select_voice(&catalog, Some("robot")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::InvalidVoice("robot".to_string()))
        );

        let random = select_voice(&catalog, None).unwrap();
        assert!(catalog.is_valid(&random));
    }

    #[test]
    fn test_load_settings_from_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "default_instructions = \"Whisper\"\n").unwrap();

        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.default_instructions, "Whisper");
    }
}
