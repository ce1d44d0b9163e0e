pub mod catalog;

pub use catalog::{capitalize_voice, VoiceCatalog, VoiceCategory, VoiceError};
