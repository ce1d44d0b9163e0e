pub mod client;
pub mod error;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::{extract_pcm, AudioBuffer, Synthesis, TtsClient};
pub use error::TtsError;
pub use retry::RetryPolicy;
pub use transport::{GeminiConfig, GeminiTransport, SpeechTransport};
pub use types::{LineContext, TtsRequest};
