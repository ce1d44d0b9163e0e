use serde::{Deserialize, Serialize};

/// The finish reason the API reports when audio was produced.
pub const FINISH_REASON_STOP: &str = "STOP";

/// A single text-to-speech request. Cache identity is the exact
/// `(instructions, voice, text)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TtsRequest {
    instructions: String,
    voice: String,
    text: String,
}

impl TtsRequest {
    pub fn new(
        instructions: impl Into<String>,
        voice: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            voice: voice.into(),
            text: text.into(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prompt(&self) -> String {
        format!("{}: {}", self.instructions, self.text)
    }
}

/// Identifies a line of a batch in events and error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext {
    pub line: usize,
    pub preview: String,
}

// Request body for `models/<id>:streamGenerateContent`.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub temperature: u32,
    #[serde(rename = "speech_config")]
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

impl GenerateContentRequest {
    pub fn speech(prompt: String, voice_name: String) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["audio".to_string()],
                temperature: 1,
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig { voice_name },
                    },
                },
            },
        }
    }
}

// Response body: a JSON array of streamed chunks. Only the first chunk's
// first candidate is consulted.

#[derive(Debug, Deserialize)]
pub struct GenerateContentChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub finish_reason: Option<String>,
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: Option<String>,
}
