//! Turns a logical operation into a fully formed HTTP request.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::OpenAIError;
use crate::models::RequestType;
use crate::multipart::{BinaryPart, MultipartForm};

/// Header carrying the optional organization identifier.
const ORGANIZATION_HEADER: &str = "openai-organization";

/// Describes one upstream call: path, method, scalar parameters and binary payloads.
#[derive(Debug, Clone)]
pub struct Operation {
    request_type: RequestType,
    method: Method,
    params: Vec<(String, Value)>,
    payloads: Vec<BinaryPart>,
}

impl Operation {
    /// Creates a POST operation against the given endpoint.
    pub fn post(request_type: RequestType) -> Self {
        Self {
            request_type,
            method: Method::POST,
            params: Vec::new(),
            payloads: Vec::new(),
        }
    }

    /// Adds a named parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Adds a named parameter when `value` is present.
    pub fn optional_param<V: Into<Value>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Adds every field of a serializable struct as a parameter, skipping nulls.
    pub fn params_from<T: Serialize>(mut self, value: &T) -> Result<Self, OpenAIError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => {
                for (name, value) in map {
                    if !value.is_null() {
                        self.params.push((name, value));
                    }
                }
                Ok(self)
            }
            other => Err(OpenAIError::Encoding(format!(
                "expected an object of parameters, got {}",
                other
            ))),
        }
    }

    /// Adds a named binary payload. Any payload switches the body to multipart.
    pub fn payload(
        mut self,
        field_name: impl Into<String>,
        bytes: impl Into<Bytes>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        self.payloads.push(BinaryPart {
            field_name: field_name.into(),
            bytes: bytes.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        });
        self
    }

    /// The endpoint this operation targets.
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Returns true if the body will be multipart encoded.
    pub fn is_multipart(&self) -> bool {
        !self.payloads.is_empty()
    }
}

/// A complete request, consumed by exactly one transport invocation.
#[derive(Debug)]
pub struct StreamRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Bytes,
}

impl StreamRequest {
    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers, including authorization and content type.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Encoded request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn into_parts(self) -> (Method, String, HeaderMap, Bytes) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builds [`StreamRequest`]s against a fixed origin with a bearer token.
#[derive(Clone)]
pub struct RequestBuilder<'a> {
    base_url: &'a str,
    api_key: &'a str,
    organization: Option<&'a str>,
}

impl std::fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("organization", &self.organization)
            .finish()
    }
}

impl<'a> RequestBuilder<'a> {
    /// Creates a builder for the given origin and bearer token.
    pub fn new(base_url: &'a str, api_key: &'a str) -> Self {
        Self {
            base_url,
            api_key,
            organization: None,
        }
    }

    /// Sends the organization header with every request.
    pub fn organization(mut self, organization: Option<&'a str>) -> Self {
        self.organization = organization;
        self
    }

    /// Resolves an endpoint path against the base origin.
    pub fn url_for(&self, request_type: RequestType) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), request_type)
    }

    /// Assembles the request for `operation`.
    ///
    /// Operations carrying binary payloads are encoded as multipart/form-data
    /// under a fresh boundary; all others are sent as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if a parameter or header cannot be written.
    pub fn build(&self, operation: Operation) -> Result<StreamRequest, OpenAIError> {
        let url = self.url_for(operation.request_type);
        let mut headers = HeaderMap::new();

        let mut auth = header_value(&format!("Bearer {}", self.api_key))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        if let Some(organization) = self.organization {
            headers.insert(ORGANIZATION_HEADER, header_value(organization)?);
        }

        let body = if operation.is_multipart() {
            let mut form = MultipartForm::new(generate_boundary());
            for (name, value) in &operation.params {
                form.append_field(name, &scalar_text(name, value)?, None, None)?;
            }
            for part in &operation.payloads {
                form.append_part(part)?;
            }
            form.finalize()?;
            headers.insert(CONTENT_TYPE, header_value(&form.content_type())?);
            form.into_body()?
        } else {
            let object: serde_json::Map<String, Value> = operation.params.into_iter().collect();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Bytes::from(serde_json::to_vec(&object)?)
        };

        debug!(
            method = %operation.method,
            url = %url,
            body_len = body.len(),
            "built request"
        );

        Ok(StreamRequest {
            method: operation.method,
            url,
            headers,
            body,
        })
    }
}

/// A fresh boundary token for one multipart body.
pub fn generate_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4())
}

fn header_value(value: &str) -> Result<HeaderValue, OpenAIError> {
    HeaderValue::from_str(value)
        .map_err(|e| OpenAIError::Encoding(format!("invalid header value: {}", e)))
}

/// Renders a parameter as multipart field text.
fn scalar_text(name: &str, value: &Value) -> Result<String, OpenAIError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(OpenAIError::Encoding(format!(
            "parameter {:?} is not a scalar and cannot be sent as a form field",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content_type(request: &StreamRequest) -> &str {
        request.headers()[CONTENT_TYPE].to_str().unwrap()
    }

    #[test]
    fn test_json_operation() {
        let builder = RequestBuilder::new("https://api.example.com/v1/", "sk-test");
        let request = builder
            .build(
                Operation::post(RequestType::ImageGenerations)
                    .param("prompt", "a cat")
                    .param("n", 2)
                    .optional_param::<String>("user", None),
            )
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url(), "https://api.example.com/v1/images/generations");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer sk-test");
        assert!(request.headers()[AUTHORIZATION].is_sensitive());
        assert_eq!(content_type(&request), "application/json");

        let body: Value = serde_json::from_slice(request.body()).unwrap();
        assert_eq!(body, json!({ "prompt": "a cat", "n": 2 }));
    }

    #[test]
    fn test_multipart_operation() {
        let builder = RequestBuilder::new("https://api.example.com/v1", "sk-test")
            .organization(Some("org-1"));
        let request = builder
            .build(
                Operation::post(RequestType::AudioTranscriptions)
                    .param("model", "whisper-1")
                    .param("temperature", 0.5)
                    .payload("file", vec![1u8, 2, 3], "audio.mp3", "audio/mpeg"),
            )
            .unwrap();

        assert_eq!(request.url(), "https://api.example.com/v1/audio/transcriptions");
        assert_eq!(request.headers()[ORGANIZATION_HEADER], "org-1");

        let boundary = content_type(&request)
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap()
            .to_string();
        assert!(boundary.starts_with("Boundary-"));

        let body = request.body();
        let text = String::from_utf8_lossy(body);
        assert!(text.starts_with(&format!("--{}\r\n", boundary)));
        assert!(text.contains("name=\"model\"\r\n\r\nwhisper-1\r\n"));
        assert!(text.contains("name=\"temperature\"\r\n\r\n0.5\r\n"));
        assert!(body.ends_with(format!("\r\n--{}--\r\n", boundary).as_bytes()));
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(generate_boundary(), generate_boundary());
    }

    #[test]
    fn test_non_scalar_form_field_rejected() {
        let builder = RequestBuilder::new("https://api.example.com/v1", "sk-test");
        let result = builder.build(
            Operation::post(RequestType::ImageEdits)
                .param("prompt", json!(["a", "b"]))
                .payload("image", Vec::<u8>::new(), "image.png", "image/png"),
        );
        assert!(matches!(result, Err(OpenAIError::Encoding(_))));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let builder = RequestBuilder::new("https://api.example.com/v1", "bad\ntoken");
        let result = builder.build(Operation::post(RequestType::ChatCompletions));
        assert!(matches!(result, Err(OpenAIError::Encoding(_))));
    }

    #[test]
    fn test_params_from_skips_nulls() {
        #[derive(Serialize)]
        struct Params {
            model: &'static str,
            user: Option<String>,
        }
        let operation = Operation::post(RequestType::ChatCompletions)
            .params_from(&Params {
                model: "gpt-4o",
                user: None,
            })
            .unwrap();
        assert_eq!(operation.params, vec![("model".to_string(), json!("gpt-4o"))]);
        assert!(!operation.is_multipart());
    }
}
