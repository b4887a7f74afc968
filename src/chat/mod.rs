//! Chat session management over the chat completions endpoint.

use crate::{
    error::OpenAIError,
    models::{ChatCompletionChunk, ChatMessage, ChatRequest, ResponseStream, Role},
    OpenAI,
};

/// A chat session with an OpenAI model.
#[derive(Debug)]
pub struct ChatSession {
    /// The API client
    client: OpenAI,
    /// Model identifier used for every turn
    model: String,
    /// Chat history
    history: Vec<ChatMessage>,
    /// System instruction for the chat
    system_instruction: Option<ChatMessage>,
}

impl ChatSession {
    /// Creates a new chat session.
    ///
    /// # Arguments
    ///
    /// * `client` - The client to send turns with
    /// * `model` - The model identifier (e.g., "gpt-4o-mini")
    pub fn new(client: OpenAI, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            history: Vec::new(),
            system_instruction: None,
        }
    }

    /// Sets a system instruction for the chat session.
    ///
    /// # Arguments
    ///
    /// * `instruction` - The system instruction text
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(ChatMessage::system(instruction));
        self
    }

    /// Sends a message to the chat and gets a response.
    ///
    /// History is only extended when the model answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response has no choices.
    pub async fn send_message(
        &mut self,
        message: impl Into<String>,
    ) -> Result<String, OpenAIError> {
        let user_message = ChatMessage::user(message);
        let request = self.request_with(user_message.clone());

        let response = self.client.create_chat_completion(request).await?;

        if let Some(choice) = response.choices.into_iter().next() {
            if choice.message.role == Role::Assistant {
                if let Some(text) = choice.message.content {
                    self.history.push(user_message);
                    self.history.push(ChatMessage::assistant(text.clone()));
                    return Ok(text);
                }
            }
        }

        Err(OpenAIError::new("No valid response from the model"))
    }

    /// Sends a message and streams the response.
    ///
    /// The user message is added to the history immediately. The streamed
    /// reply is not; record it with [`ChatSession::add_model_response`] once
    /// it has been read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built. Network and decode
    /// failures surface through the stream.
    pub fn send_message_streaming(
        &mut self,
        message: impl Into<String>,
    ) -> Result<ResponseStream<ChatCompletionChunk>, OpenAIError> {
        let user_message = ChatMessage::user(message);
        let request = self.request_with(user_message.clone());

        let stream = self.client.create_chat_completion_stream(request)?;
        self.history.push(user_message);
        Ok(stream)
    }

    /// Adds a model response to the chat history.
    pub fn add_model_response(&mut self, response: impl Into<String>) {
        self.history.push(ChatMessage::assistant(response));
    }

    fn request_with(&self, user_message: ChatMessage) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.extend(self.system_instruction.iter().cloned());
        messages.extend(self.history.iter().cloned());
        messages.push(user_message);

        ChatRequest::builder()
            .model(self.model.clone())
            .messages(messages)
            .build()
    }

    /// Clears the chat history while keeping the system instruction.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Returns the current chat history.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Returns the system instruction if set.
    pub fn system_instruction(&self) -> Option<&ChatMessage> {
        self.system_instruction.as_ref()
    }
}
