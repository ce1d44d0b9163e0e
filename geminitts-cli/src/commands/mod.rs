pub mod generate;
pub mod list_voices;
pub mod merge;
