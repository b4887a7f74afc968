//! Data structures for the OpenAI API requests and responses.

mod audio;
mod chat;
mod client_params;
mod image;
mod payload;
mod request_type;
mod speech;
mod stream;

pub use audio::{
    AudioModel, AudioResponseFormat, AudioTextResponse, TranscriptionRequest, TranslationRequest,
};
pub use chat::{
    ChatChoice, ChatCompletionChunk, ChatDelta, ChatMessage, ChatRequest, ChatResponse,
    ChunkChoice, ResponseMessage, Role, Usage,
};
pub use client_params::{ClientParams, DEFAULT_BASE_URL};
pub use image::{
    CreateImageRequest, EditImageRequest, ImageData, ImageModel, ImageResponse,
    ImageResponseFormat, ImageSize, VariationImageRequest,
};
pub use payload::FilePayload;
pub use request_type::RequestType;
pub use speech::{SpeechModel, SpeechRequest, SpeechResponseFormat, Voice};
pub use stream::ResponseStream;
