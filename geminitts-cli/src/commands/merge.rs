use std::path::PathBuf;

use anyhow::{Context, Result};
use geminitts_core::merge::{default_output_name, merge_wav_files};

use crate::console::Console;

#[derive(clap::Args, Debug, Clone)]
pub struct MergeArgs {
    /// Glob pattern for WAV files (e.g. '*.wav', 'trial03-*.wav', '**/*.wav')
    pub pattern: String,

    /// Output WAV file (derived from the pattern when omitted)
    #[arg(short = 'o', long = "outputfile")]
    pub output: Option<PathBuf>,
}

pub fn run(args: MergeArgs, console: &Console) -> Result<()> {
    let root = std::env::current_dir().context("Failed to get current directory")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_output_name(&args.pattern)));

    let report = merge_wav_files(&args.pattern, &root, Some(&output))?;

    console.print_system(&format!("🔍 Merged {} WAV files:", report.inputs.len()));
    for file in &report.inputs {
        let shown = file.strip_prefix(&root).unwrap_or(file);
        console.print_system(&format!("  📄 {}", shown.display()));
    }
    console.print_system(&format!("📁 Output file: {}", output.display()));
    if !report.summary.formats_match() {
        console.print_warning(
            "Input files have different formats. Using first file's format for output.",
        );
    }

    console.print_success(&format!(
        "Successfully merged {} files into {}",
        report.inputs.len(),
        report.output.display()
    ));
    Ok(())
}
