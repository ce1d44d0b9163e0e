use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::wav::{concat, AudioError, ConcatSummary};

/// Concatenates WAV files into `output`, in the given order.
///
/// The output is written to a temporary file next to `output` and renamed
/// into place, so a failed merge never leaves a truncated file behind.
/// Inputs are opened one at a time.
pub fn concat_files(inputs: &[PathBuf], output: &Path) -> Result<ConcatSummary, AudioError> {
    if inputs.is_empty() {
        return Err(AudioError::NoSources);
    }

    let temp_path = sibling_temp_path(output);
    let result = write_concat(inputs, &temp_path);

    match result {
        Ok(summary) => {
            fs::rename(&temp_path, output).map_err(|source| {
                let _ = fs::remove_file(&temp_path);
                AudioError::Output {
                    path: output.to_path_buf(),
                    source,
                }
            })?;
            debug!(?output, sources = summary.sources, "Wrote merged WAV file");
            Ok(summary)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?temp_path, error = %cleanup, "Failed to remove temporary merge output");
                }
            }
            Err(e)
        }
    }
}

fn write_concat(inputs: &[PathBuf], temp_path: &Path) -> Result<ConcatSummary, AudioError> {
    let file = File::create(temp_path).map_err(|source| AudioError::Output {
        path: temp_path.to_path_buf(),
        source,
    })?;

    concat(
        inputs.iter().map(|path| File::open(path).map(BufReader::new)),
        BufWriter::new(file),
    )
}

fn sibling_temp_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "merged.wav".to_string());
    output.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
}
