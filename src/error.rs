//! Error types for the OpenAI client.

use thiserror::Error;

/// Maximum number of body bytes kept in a [`OpenAIError::Decode`] error.
const DECODE_BODY_PREVIEW: usize = 512;

/// Errors that can occur when using the OpenAI client.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Base error for the OpenAI client.
    #[error("[OpenAI Error]: {message}")]
    Base {
        /// Error message
        message: String,
    },

    /// A field or value could not be encoded into the request.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A request parameter is outside its accepted range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A received chunk or body is not valid JSON for the expected schema.
    #[error("Failed to decode response: {source}. Body: {body}")]
    Decode {
        /// The underlying JSON error
        source: serde_json::Error,
        /// A truncated copy of the offending text
        body: String,
    },

    /// The underlying network request failed.
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Error occurred when accessing environment variables.
    #[error("Environment variable not found: {0}")]
    EnvError(#[from] std::env::VarError),

    /// Error occurred when serializing a JSON request body.
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error occurred when decoding base64 image data.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Error occurred when reading an upload from disk.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpenAIError {
    /// Creates a new Base error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Base {
            message: message.into(),
        }
    }

    /// Creates a decode error, keeping a bounded preview of the body.
    pub fn decode(source: serde_json::Error, body: &[u8]) -> Self {
        let end = body.len().min(DECODE_BODY_PREVIEW);
        Self::Decode {
            source,
            body: String::from_utf8_lossy(&body[..end]).into_owned(),
        }
    }

    /// Returns true if this is a decode error.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_truncates_body() {
        let body = vec![b'x'; 2048];
        let source = serde_json::from_slice::<serde_json::Value>(&body).unwrap_err();
        match OpenAIError::decode(source, &body) {
            OpenAIError::Decode { body, .. } => assert_eq!(body.len(), DECODE_BODY_PREVIEW),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_message() {
        let err = OpenAIError::new("boom");
        assert_eq!(err.to_string(), "[OpenAI Error]: boom");
        assert!(!err.is_decode());
    }
}
