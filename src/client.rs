//! Client implementation for the OpenAI API.

use std::env::VarError;

use bytes::Bytes;
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::{
    error::OpenAIError,
    models::{
        AudioTextResponse, ChatCompletionChunk, ChatRequest, ChatResponse, ClientParams,
        CreateImageRequest, EditImageRequest, ImageResponse, ResponseStream, SpeechRequest,
        TranscriptionRequest, TranslationRequest, VariationImageRequest,
    },
    request::{Operation, RequestBuilder},
    transport::{DeliveryMode, StreamingTransport},
};

/// A client for interacting with the OpenAI API.
///
/// The client holds the bearer token, the base origin and a pooled HTTP
/// client. It is cheap to clone and safe to share; every call builds its own
/// request and transport.
#[derive(Clone)]
pub struct OpenAI {
    api_key: String,
    params: ClientParams,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("api_key", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

impl OpenAI {
    /// Creates a new client with the specified API key and parameters.
    ///
    /// # Arguments
    ///
    /// * `api_key` - The API key sent as a bearer token
    /// * `params` - Origin, timeout and organization settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        params: impl Into<ClientParams>,
    ) -> Result<Self, OpenAIError> {
        let params = params.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = params.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            api_key: api_key.into(),
            params,
            client: builder.build()?,
        })
    }

    /// Creates a new client from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `OPENAI_API_KEY` - The API key for authentication
    /// * `OPENAI_BASE_URL` - Optional override of the API origin
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not set, or if either variable
    /// is not valid unicode.
    pub fn from_env() -> Result<Self, OpenAIError> {
        let api_key = std::env::var("OPENAI_API_KEY")?;
        let params = params_from_base_url(std::env::var("OPENAI_BASE_URL"))?;
        Self::new(api_key, params)
    }

    /// The parameters this client was built with.
    pub fn params(&self) -> &ClientParams {
        &self.params
    }

    fn request_builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.params.base_url, &self.api_key)
            .organization(self.params.organization.as_deref())
    }

    /// Builds the request for `operation` and streams its records.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the request cannot be built; nothing is
    /// sent in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn execute<T>(
        &self,
        operation: Operation,
        mode: DeliveryMode,
    ) -> Result<ResponseStream<T>, OpenAIError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = self.request_builder().build(operation)?;
        Ok(StreamingTransport::new(self.client.clone(), mode).send(request))
    }

    /// Sends a non-streaming operation and returns its single record, if any.
    async fn execute_single<T>(&self, operation: Operation) -> Result<Option<T>, OpenAIError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut stream = self.execute(operation, DeliveryMode::SingleShot)?;
        stream.next().await.transpose()
    }

    /// Transcribes audio into the input language.
    ///
    /// Records are yielded as they are decoded from the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or the request cannot be
    /// encoded. Network and decode failures surface through the stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn create_transcription(
        &self,
        request: TranscriptionRequest,
    ) -> Result<ResponseStream<AudioTextResponse>, OpenAIError> {
        let mode = request.delivery_mode;
        self.execute(request.into_operation()?, mode)
    }

    /// Translates audio into English.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or the request cannot be
    /// encoded. Network and decode failures surface through the stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn create_translation(
        &self,
        request: TranslationRequest,
    ) -> Result<ResponseStream<AudioTextResponse>, OpenAIError> {
        let mode = request.delivery_mode;
        self.execute(request.into_operation()?, mode)
    }

    /// Edits an image using a mask and a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the network call fails or
    /// the response cannot be decoded.
    pub async fn edit_image(
        &self,
        request: EditImageRequest,
    ) -> Result<Option<ImageResponse>, OpenAIError> {
        self.execute_single(request.into_operation()?).await
    }

    /// Creates variations of an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the network call fails or
    /// the response cannot be decoded.
    pub async fn variation_image(
        &self,
        request: VariationImageRequest,
    ) -> Result<Option<ImageResponse>, OpenAIError> {
        self.execute_single(request.into_operation()?).await
    }

    /// Generates images from a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the network call fails or
    /// the response cannot be decoded.
    pub async fn create_image(
        &self,
        request: CreateImageRequest,
    ) -> Result<Option<ImageResponse>, OpenAIError> {
        self.execute_single(request.into_operation()?).await
    }

    /// Creates a chat completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the network call fails or
    /// the response cannot be decoded.
    pub async fn create_chat_completion(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse, OpenAIError> {
        self.execute_single(request.into_operation()?)
            .await?
            .ok_or_else(|| OpenAIError::new("No response from the chat completions endpoint"))
    }

    /// Creates a chat completion delivered as a stream of chunks.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or the request cannot be
    /// encoded. Network and decode failures surface through the stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn create_chat_completion_stream(
        &self,
        request: ChatRequest,
    ) -> Result<ResponseStream<ChatCompletionChunk>, OpenAIError> {
        self.execute(request.into_stream_operation()?, DeliveryMode::EventStream)
    }

    /// Generates spoken audio from text and returns the encoded audio bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, the network call fails or
    /// the endpoint answers with a non-success status.
    pub async fn create_speech(&self, request: SpeechRequest) -> Result<Bytes, OpenAIError> {
        let request = self.request_builder().build(request.into_operation()?)?;
        StreamingTransport::new(self.client.clone(), DeliveryMode::SingleShot)
            .bytes(request)
            .await
    }
}

fn params_from_base_url(base_url: Result<String, VarError>) -> Result<ClientParams, OpenAIError> {
    match base_url {
        Ok(base_url) => Ok(ClientParams::builder().base_url(base_url).build()),
        Err(VarError::NotPresent) => Ok(ClientParams::default()),
        Err(e) => Err(e.into()),
    }
}
