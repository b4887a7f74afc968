//! Binary uploads attached to multipart requests.

use std::path::Path;

use bytes::Bytes;

use crate::error::OpenAIError;

/// Raw bytes plus the filename and MIME type they are uploaded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// The file contents
    pub bytes: Bytes,
    /// Filename sent in the part header
    pub filename: String,
    /// MIME type sent in the part header
    pub mime_type: String,
}

impl FilePayload {
    /// Creates a payload from raw parts.
    pub fn new(
        bytes: impl Into<Bytes>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A PNG image uploaded as `image.png`.
    pub fn png(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, "image.png", "image/png")
    }

    /// An audio clip uploaded as `audio.mp3`.
    pub fn audio(bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, "audio.mp3", "audio/mpeg")
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its MIME type is unknown.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, OpenAIError> {
        let path = path.as_ref();
        let mime_type = mime_guess::from_path(path)
            .first()
            .ok_or_else(|| {
                OpenAIError::Encoding(format!("Unknown MIME type for {:?}", path))
            })?
            .to_string();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(bytes, filename, mime_type))
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length payload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_from_path_guesses_mime() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"\x89PNG").unwrap();

        let payload = FilePayload::from_path(file.path()).await.unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert!(payload.filename.ends_with(".png"));
        assert_eq!(payload.bytes.as_ref(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_from_path_unknown_extension() {
        let file = tempfile::Builder::new()
            .suffix(".nosuchext")
            .tempfile()
            .unwrap();
        let result = FilePayload::from_path(file.path()).await;
        assert!(matches!(result, Err(OpenAIError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = FilePayload::from_path("/definitely/not/here.mp3").await;
        assert!(matches!(result, Err(OpenAIError::Io(_))));
    }

    #[test]
    fn test_constructors() {
        let audio = FilePayload::audio(vec![1u8, 2]);
        assert_eq!(audio.mime_type, "audio/mpeg");
        assert_eq!(audio.len(), 2);
        assert!(FilePayload::png(Vec::<u8>::new()).is_empty());
    }
}
