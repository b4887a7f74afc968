use std::fmt;

/// The upstream endpoint a request targets, rendered as its path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestType {
    /// Transcribe audio into the input language.
    AudioTranscriptions,
    /// Translate audio into English.
    AudioTranslations,
    /// Synthesize speech from text.
    AudioSpeech,
    /// Edit an image with a mask and a prompt.
    ImageEdits,
    /// Create variations of an image.
    ImageVariations,
    /// Generate images from a prompt.
    ImageGenerations,
    /// Create a chat completion.
    ChatCompletions,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioTranscriptions => write!(f, "audio/transcriptions"),
            Self::AudioTranslations => write!(f, "audio/translations"),
            Self::AudioSpeech => write!(f, "audio/speech"),
            Self::ImageEdits => write!(f, "images/edits"),
            Self::ImageVariations => write!(f, "images/variations"),
            Self::ImageGenerations => write!(f, "images/generations"),
            Self::ChatCompletions => write!(f, "chat/completions"),
        }
    }
}
