pub mod file;
pub mod wav;

pub use file::concat_files;
pub use wav::{
    concat, concat_bytes, wrap_pcm, AudioError, ConcatSummary, PcmFormat, GEMINI_PCM_FORMAT,
};
