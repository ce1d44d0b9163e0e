use std::path::{Path, PathBuf};

use uuid::Uuid;

const DEFAULT_EXTENSION: &str = "wav";

/// `output.wav` + 1 → `output-01.wav`. A missing extension becomes `.wav`.
pub fn numbered_filename(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    let name = format!("{stem}-{index:02}.{extension}");
    match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// A fresh, unique `.wav` path in `dir`.
pub fn temp_wav_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.{DEFAULT_EXTENSION}", Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("output.wav", 1, "output-01.wav")]
    #[case("output", 3, "output-03.wav")]
    #[case("test.mp3", 7, "test-07.mp3")]
    #[case("speech.wav", 12, "speech-12.wav")]
    #[case("speech.wav", 123, "speech-123.wav")]
    #[case("out/dir/take.wav", 2, "out/dir/take-02.wav")]
    #[case("archive.tar.wav", 5, "archive.tar-05.wav")]
    fn test_numbered_filename(#[case] base: &str, #[case] index: usize, #[case] expected: &str) {
        assert_eq!(
            numbered_filename(Path::new(base), index),
            PathBuf::from(expected)
        );
    }

    #[test]
    fn test_temp_wav_paths_are_unique() {
        let dir = Path::new("/tmp");
        let a = temp_wav_path(dir);
        let b = temp_wav_path(dir);
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "wav");
        assert_eq!(a.parent().unwrap(), dir);
    }
}
