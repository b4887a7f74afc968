//! Transcription and translation models.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{FilePayload, RequestType};
use crate::error::OpenAIError;
use crate::request::Operation;
use crate::transport::DeliveryMode;

/// Speech-to-text model identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioModel {
    /// Whisper v2
    #[default]
    #[serde(rename = "whisper-1")]
    Whisper1,
}

impl AudioModel {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Whisper1 => "whisper-1",
        }
    }
}

/// JSON response formats for audio endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioResponseFormat {
    /// `{ "text": ... }`
    #[default]
    Json,
    /// `text` plus language, duration and segments
    VerboseJson,
}

impl AudioResponseFormat {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::VerboseJson => "verbose_json",
        }
    }
}

/// Parameters for `audio/transcriptions`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct TranscriptionRequest {
    /// The audio to transcribe
    pub file: FilePayload,
    /// Model to use
    #[builder(default)]
    pub model: AudioModel,
    /// ISO-639-1 language of the input audio
    #[builder(default, setter(strip_option, into))]
    pub language: Option<String>,
    /// Text to guide the model's style
    #[builder(default, setter(strip_option, into))]
    pub prompt: Option<String>,
    /// Response format
    #[builder(default)]
    pub response_format: AudioResponseFormat,
    /// Sampling temperature between 0 and 1
    #[builder(default, setter(strip_option))]
    pub temperature: Option<f64>,
    /// How the response body is consumed. Defaults to collecting the whole
    /// body; `Incremental` only suits servers that send one record per chunk.
    #[builder(default)]
    pub delivery_mode: DeliveryMode,
}

impl TranscriptionRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        validate_temperature(self.temperature)?;
        Ok(Operation::post(RequestType::AudioTranscriptions)
            .param("model", self.model.as_str())
            .optional_param("language", self.language)
            .optional_param("prompt", self.prompt)
            .param("response_format", self.response_format.as_str())
            .optional_param("temperature", self.temperature)
            .payload(
                "file",
                self.file.bytes,
                self.file.filename,
                self.file.mime_type,
            ))
    }
}

/// Parameters for `audio/translations`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct TranslationRequest {
    /// The audio to translate into English
    pub file: FilePayload,
    /// Model to use
    #[builder(default)]
    pub model: AudioModel,
    /// English text to guide the model's style
    #[builder(default, setter(strip_option, into))]
    pub prompt: Option<String>,
    /// Response format
    #[builder(default)]
    pub response_format: AudioResponseFormat,
    /// Sampling temperature between 0 and 1
    #[builder(default, setter(strip_option))]
    pub temperature: Option<f64>,
    /// How the response body is consumed. Defaults to collecting the whole
    /// body; `Incremental` only suits servers that send one record per chunk.
    #[builder(default)]
    pub delivery_mode: DeliveryMode,
}

impl TranslationRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        validate_temperature(self.temperature)?;
        Ok(Operation::post(RequestType::AudioTranslations)
            .param("model", self.model.as_str())
            .optional_param("prompt", self.prompt)
            .param("response_format", self.response_format.as_str())
            .optional_param("temperature", self.temperature)
            .payload(
                "file",
                self.file.bytes,
                self.file.filename,
                self.file.mime_type,
            ))
    }
}

fn validate_temperature(temperature: Option<f64>) -> Result<(), OpenAIError> {
    match temperature {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(OpenAIError::InvalidParameter(format!(
            "temperature must be between 0 and 1, got {}",
            t
        ))),
        _ => Ok(()),
    }
}

/// A decoded transcription or translation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTextResponse {
    /// The recognised text
    pub text: String,
    /// The task performed, present for `verbose_json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Detected language, present for `verbose_json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Input duration in seconds, present for `verbose_json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl AudioTextResponse {
    /// Returns the recognised text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::{stream, StreamExt};

    fn file() -> FilePayload {
        FilePayload::audio(vec![0u8; 4])
    }

    #[test]
    fn test_transcription_defaults() {
        let request = TranscriptionRequest::builder().file(file()).build();
        assert_eq!(request.model, AudioModel::Whisper1);
        assert_eq!(request.response_format, AudioResponseFormat::Json);
        assert_eq!(request.delivery_mode, DeliveryMode::SingleShot);
        assert!(request.into_operation().unwrap().is_multipart());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let request = TranslationRequest::builder()
            .file(file())
            .temperature(1.5)
            .build();
        assert!(matches!(
            request.into_operation(),
            Err(OpenAIError::InvalidParameter(_))
        ));

        let request = TranscriptionRequest::builder()
            .file(file())
            .temperature(-0.1)
            .build();
        assert!(request.into_operation().is_err());
    }

    #[test]
    fn test_verbose_record_decodes() {
        let record: AudioTextResponse = serde_json::from_str(
            r#"{"task":"transcribe","language":"english","duration":1.5,"text":"hi","segments":[]}"#,
        )
        .unwrap();
        assert_eq!(record.text(), "hi");
        assert_eq!(record.language.as_deref(), Some("english"));
    }

    #[tokio::test]
    async fn test_default_mode_decodes_split_body() {
        let request = TranscriptionRequest::builder()
            .file(file())
            .response_format(AudioResponseFormat::VerboseJson)
            .build();
        let text = "word ".repeat(4000);
        let body = format!(
            r#"{{"task":"transcribe","language":"english","duration":120.0,"text":"{}","segments":[]}}"#,
            text
        );
        let (head, tail) = body.as_bytes().split_at(body.len() / 2);
        let chunks = vec![
            Ok::<_, OpenAIError>(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
        ];

        let records: Vec<_> =
            crate::transport::decode_chunks::<_, _, AudioTextResponse>(
                stream::iter(chunks),
                request.delivery_mode,
            )
            .collect()
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().text(), text);
    }
}
