//! Merging WAV files on disk that match a simple glob pattern.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::audio::{concat_files, AudioError, ConcatSummary};

const RECURSIVE_PREFIX: &str = "**/";
const WAV_EXTENSION: &str = ".wav";

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Pattern must include '*.wav' file extension.")]
    InvalidPattern(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    BadWildcard { pattern: String, message: String },

    #[error("No WAV files found matching pattern '{0}'.")]
    NoMatches(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub summary: ConcatSummary,
}

/// Files under `root` matching `pattern`, sorted by path.
///
/// A `**/` prefix searches every subdirectory; otherwise only the directory
/// named by the pattern (relative to `root`) is searched. `*` and `?` match
/// within a single file name.
pub fn find_wav_files(pattern: &str, root: &Path) -> Result<Vec<PathBuf>, MergeError> {
    if !pattern.contains(WAV_EXTENSION) {
        return Err(MergeError::InvalidPattern(pattern.to_string()));
    }

    let (search_dir, name_pattern, recursive) = match pattern.strip_prefix(RECURSIVE_PREFIX) {
        Some(rest) => (root.to_path_buf(), rest.to_string(), true),
        None => {
            let as_path = Path::new(pattern);
            let name = as_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dir = match as_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
                _ => root.to_path_buf(),
            };
            (dir, name, false)
        }
    };

    let matcher = wildcard_regex(&name_pattern).map_err(|e| MergeError::BadWildcard {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    debug!(?search_dir, %name_pattern, recursive, "Searching for WAV files");

    let mut walker = WalkDir::new(&search_dir).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            matcher.is_match(&name) && has_wav_suffix(&name)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str("[^/]*"),
            '?' => expr.push_str("[^/]"),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

fn has_wav_suffix(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(WAV_EXTENSION)
}

/// `**/…` → `all-merged.wav`, `*.wav` → `merged.wav`,
/// `trial03-*.wav` → `trial03-merged.wav`.
pub fn default_output_name(pattern: &str) -> String {
    if pattern.starts_with(RECURSIVE_PREFIX) {
        return "all-merged.wav".to_string();
    }

    let stem = Path::new(pattern)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = stem.replace('*', "");
    let base = base.trim_end_matches('-');

    if base.is_empty() {
        "merged.wav".to_string()
    } else {
        format!("{base}-merged.wav")
    }
}

/// Finds the files matching `pattern` under `root` and concatenates them into
/// `output` (or the default name in `root`). The output file itself is never
/// used as an input.
pub fn merge_wav_files(
    pattern: &str,
    root: &Path,
    output: Option<&Path>,
) -> Result<MergeReport, MergeError> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => root.join(default_output_name(pattern)),
    };

    let inputs: Vec<PathBuf> = find_wav_files(pattern, root)?
        .into_iter()
        .filter(|path| !same_file(path, &output))
        .collect();

    if inputs.is_empty() {
        return Err(MergeError::NoMatches(pattern.to_string()));
    }

    let summary = concat_files(&inputs, &output)?;
    info!(files = inputs.len(), ?output, "Merged WAV files");

    Ok(MergeReport {
        inputs,
        output,
        summary,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{wrap_pcm, GEMINI_PCM_FORMAT};
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn write_wav(path: &Path, samples: &[i16]) {
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, wrap_pcm(&pcm, GEMINI_PCM_FORMAT).unwrap()).unwrap();
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[rstest]
    #[case("*.wav", "merged.wav")]
    #[case("**/*.wav", "all-merged.wav")]
    #[case("trial03-*.wav", "trial03-merged.wav")]
    #[case("test*.wav", "test-merged.wav")]
    #[case("output-*.wav", "output-merged.wav")]
    #[case("file*.mp3", "file-merged.wav")]
    #[case("takes/scene1-*.wav", "scene1-merged.wav")]
    fn test_default_output_name(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(default_output_name(pattern), expected);
    }

    #[test]
    fn test_pattern_must_mention_wav() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_wav_files("*.mp3", dir.path()),
            Err(MergeError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_find_top_level_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_wav(&root.join("b.wav"), &[1]);
        write_wav(&root.join("a.wav"), &[1]);
        write_wav(&root.join("nested/c.wav"), &[1]);
        fs::write(root.join("notes.txt"), "x").unwrap();

        let files = find_wav_files("*.wav", root).unwrap();
        assert_eq!(names(root, &files), vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_find_recursive() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_wav(&root.join("b.wav"), &[1]);
        write_wav(&root.join("nested/a.wav"), &[1]);
        write_wav(&root.join("nested/deeper/z.wav"), &[1]);

        let files = find_wav_files("**/*.wav", root).unwrap();
        assert_eq!(
            names(root, &files),
            vec!["b.wav", "nested/a.wav", "nested/deeper/z.wav"]
        );
    }

    #[test]
    fn test_find_with_prefix_and_single_char_wildcard() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for name in ["trial03-1.wav", "trial03-2.wav", "trial04-1.wav", "trial03-10.wav"] {
            write_wav(&root.join(name), &[1]);
        }

        let files = find_wav_files("trial03-?.wav", root).unwrap();
        assert_eq!(names(root, &files), vec!["trial03-1.wav", "trial03-2.wav"]);

        let files = find_wav_files("trial03-*.wav", root).unwrap();
        assert_eq!(
            names(root, &files),
            vec!["trial03-1.wav", "trial03-10.wav", "trial03-2.wav"]
        );
    }

    #[test]
    fn test_merge_excludes_output_and_concatenates_in_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_wav(&root.join("part-1.wav"), &[1, 2]);
        write_wav(&root.join("part-2.wav"), &[3]);
        // Left over from an earlier run; must not feed into itself.
        write_wav(&root.join("part-merged.wav"), &[9, 9, 9]);

        let report = merge_wav_files("part-*.wav", root, None).unwrap();
        assert_eq!(report.output, root.join("part-merged.wav"));
        assert_eq!(names(root, &report.inputs), vec!["part-1.wav", "part-2.wav"]);

        let mut reader = hound::WavReader::open(&report.output).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_no_matches() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            merge_wav_files("*.wav", dir.path(), None),
            Err(MergeError::NoMatches(_))
        ));
    }
}
