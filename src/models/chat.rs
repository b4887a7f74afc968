//! Chat completion models.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::RequestType;
use crate::error::OpenAIError;
use crate::request::Operation;

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the assistant
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The message author
    pub role: Role,
    /// The message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Parameters for `chat/completions`.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4o-mini")
    #[builder(setter(into), default = String::from("gpt-4o-mini"))]
    pub model: String,
    /// The conversation so far
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature between 0 and 2
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub temperature: Option<f64>,
    /// Nucleus sampling probability mass
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub top_p: Option<f64>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub max_tokens: Option<u32>,
    /// End-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
    /// Set when the completion is requested as an event stream
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(skip))]
    pub stream: Option<bool>,
}

impl ChatRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(OpenAIError::InvalidParameter(format!(
                    "temperature must be between 0 and 2, got {}",
                    t
                )));
            }
        }
        if self.messages.is_empty() {
            return Err(OpenAIError::InvalidParameter(
                "messages must not be empty".into(),
            ));
        }
        Operation::post(RequestType::ChatCompletions).params_from(&self)
    }

    /// Like [`ChatRequest::into_operation`], asking for the completion as an
    /// event stream of [`ChatCompletionChunk`]s.
    pub fn into_stream_operation(mut self) -> Result<Operation, OpenAIError> {
        self.stream = Some(true);
        self.into_operation()
    }
}

/// A chat completion result.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Generated choices
    pub choices: Vec<ChatChoice>,
    /// Token accounting
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Returns the text of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

/// One generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Position in the choices array
    #[serde(default)]
    pub index: u32,
    /// The generated message
    pub message: ResponseMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A message produced by the model.
///
/// Unlike [`ChatMessage`], content may be absent, e.g. when the model refuses
/// or answers with tool calls only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseMessage {
    /// The message author
    pub role: Role,
    /// The message text
    #[serde(default)]
    pub content: Option<String>,
    /// Refusal text, when the model declined to answer
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Token usage for a request.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// One event of a streamed chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion identifier, shared by every chunk of one completion
    #[serde(default)]
    pub id: String,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Incremental choices
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Returns the text fragment of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}

/// A choice inside a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Position in the choices array
    #[serde(default)]
    pub index: u32,
    /// What this chunk adds to the message
    #[serde(default)]
    pub delta: ChatDelta,
    /// Set on the last chunk of the choice
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The part of a message carried by one chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatDelta {
    /// Present on the first chunk only
    #[serde(default)]
    pub role: Option<Role>,
    /// Text fragment to append
    #[serde(default)]
    pub content: Option<String>,
}
