//! Text-to-speech models.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::RequestType;
use crate::error::OpenAIError;
use crate::request::Operation;

/// Longest input the speech endpoint accepts, in characters.
const MAX_INPUT_CHARS: usize = 4096;

/// Speech model identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechModel {
    /// Optimized for latency
    #[default]
    #[serde(rename = "tts-1")]
    Tts1,
    /// Optimized for quality
    #[serde(rename = "tts-1-hd")]
    Tts1Hd,
}

/// Voices available to the speech models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

/// Encoding of the generated audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SpeechResponseFormat {
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
}

/// Parameters for `audio/speech`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct SpeechRequest {
    /// Model to use
    #[builder(default)]
    pub model: SpeechModel,
    /// The text to speak
    #[builder(setter(into))]
    pub input: String,
    /// Voice to speak with
    #[builder(default)]
    pub voice: Voice,
    /// Audio encoding, mp3 when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub response_format: Option<SpeechResponseFormat>,
    /// Playback speed between 0.25 and 4.0
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub speed: Option<f64>,
}

impl SpeechRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        if self.input.is_empty() {
            return Err(OpenAIError::InvalidParameter(
                "input must not be empty".into(),
            ));
        }
        let chars = self.input.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(OpenAIError::InvalidParameter(format!(
                "input must be at most {} characters, got {}",
                MAX_INPUT_CHARS, chars
            )));
        }
        if let Some(speed) = self.speed {
            if !(0.25..=4.0).contains(&speed) {
                return Err(OpenAIError::InvalidParameter(format!(
                    "speed must be between 0.25 and 4.0, got {}",
                    speed
                )));
            }
        }
        Operation::post(RequestType::AudioSpeech).params_from(&self)
    }
}
