pub mod naming;
pub mod scheduler;

pub use naming::{numbered_filename, temp_wav_path};
pub use scheduler::{
    BatchError, BatchJob, BatchReport, BatchScheduler, JobState, LineOutcome, MergedOutput,
};
