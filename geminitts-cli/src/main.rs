use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

use crate::commands::{generate::GenerateArgs, merge::MergeArgs};
use crate::console::Console;

#[derive(Parser, Debug)]
#[command(name = "geminitts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gemini TTS CLI - Convert text to speech using the Google Gemini API")]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all available voices
    ListVoices,
    /// Merge multiple WAV files into one WAV file
    Merge(MergeArgs),
}

fn main() {
    let args = Args::parse();

    // Audio on stdout must not be mixed with anything else.
    let console = if args.command.is_none() && args.generate.streams_to_stdout() {
        Console::quiet()
    } else {
        Console::new()
    };

    if let Err(e) = setup_tracing() {
        console.print_warning(&format!("Logging disabled: {e:#}"));
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(async_main(args, console.clone())));

    if let Err(e) = result {
        error!("Command failed: {e:#}");
        console.print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn async_main(args: Args, console: Console) -> Result<()> {
    info!(command = ?args.command, "CLI startup");

    match args.command {
        Some(Command::ListVoices) => {
            commands::list_voices::run(&console);
            Ok(())
        }
        Some(Command::Merge(merge)) => commands::merge::run(merge, &console),
        None => commands::generate::run(args.generate, console).await,
    }
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    let trace_dir = home.join(".geminitts").join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("geminitts.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
