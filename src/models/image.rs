//! Image generation, edit and variation models.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{FilePayload, RequestType};
use crate::error::OpenAIError;
use crate::request::Operation;

/// Maximum number of images per request.
const MAX_IMAGES: u32 = 10;

/// Image model identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageModel {
    /// DALL·E 2
    #[default]
    #[serde(rename = "dall-e-2")]
    DallE2,
    /// DALL·E 3
    #[serde(rename = "dall-e-3")]
    DallE3,
}

impl ImageModel {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DallE2 => "dall-e-2",
            Self::DallE3 => "dall-e-3",
        }
    }
}

/// Output image dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    /// 256x256
    #[serde(rename = "256x256")]
    S256,
    /// 512x512
    #[serde(rename = "512x512")]
    S512,
    /// 1024x1024
    #[default]
    #[serde(rename = "1024x1024")]
    S1024,
}

impl ImageSize {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "256x256",
            Self::S512 => "512x512",
            Self::S1024 => "1024x1024",
        }
    }
}

/// How generated images are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageResponseFormat {
    /// A temporary URL
    #[default]
    Url,
    /// Inline base64-encoded PNG
    B64Json,
}

impl ImageResponseFormat {
    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::B64Json => "b64_json",
        }
    }
}

/// Parameters for `images/edits`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct EditImageRequest {
    /// The PNG image to edit
    pub image: FilePayload,
    /// PNG whose transparent areas mark where `image` is edited
    #[builder(default, setter(strip_option))]
    pub mask: Option<FilePayload>,
    /// Description of the desired edit
    #[builder(setter(into))]
    pub prompt: String,
    /// Model to use
    #[builder(default)]
    pub model: ImageModel,
    /// Number of images to produce
    #[builder(default = 1)]
    pub n: u32,
    /// Output size
    #[builder(default)]
    pub size: ImageSize,
    /// Output format
    #[builder(default, setter(strip_option))]
    pub response_format: Option<ImageResponseFormat>,
    /// End-user identifier
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
}

impl EditImageRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        validate_count(self.n)?;
        let operation = Operation::post(RequestType::ImageEdits)
            .param("model", self.model.as_str())
            .param("prompt", self.prompt)
            .param("n", self.n)
            .param("size", self.size.as_str())
            .optional_param("response_format", self.response_format.map(|f| f.as_str()))
            .optional_param("user", self.user)
            .payload(
                "image",
                self.image.bytes,
                self.image.filename,
                self.image.mime_type,
            );
        Ok(match self.mask {
            Some(mask) => operation.payload("mask", mask.bytes, mask.filename, mask.mime_type),
            None => operation,
        })
    }
}

/// Parameters for `images/variations`.
#[derive(Debug, Clone, TypedBuilder)]
pub struct VariationImageRequest {
    /// The PNG image to vary
    pub image: FilePayload,
    /// Model to use
    #[builder(default)]
    pub model: ImageModel,
    /// Number of images to produce
    #[builder(default = 1)]
    pub n: u32,
    /// Output size
    #[builder(default)]
    pub size: ImageSize,
    /// Output format
    #[builder(default, setter(strip_option))]
    pub response_format: Option<ImageResponseFormat>,
    /// End-user identifier
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
}

impl VariationImageRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        validate_count(self.n)?;
        Ok(Operation::post(RequestType::ImageVariations)
            .param("model", self.model.as_str())
            .param("n", self.n)
            .param("size", self.size.as_str())
            .optional_param("response_format", self.response_format.map(|f| f.as_str()))
            .optional_param("user", self.user)
            .payload(
                "image",
                self.image.bytes,
                self.image.filename,
                self.image.mime_type,
            ))
    }
}

/// Parameters for `images/generations`, sent as JSON.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct CreateImageRequest {
    /// Description of the desired image
    #[builder(setter(into))]
    pub prompt: String,
    /// Model to use
    #[builder(default)]
    pub model: ImageModel,
    /// Number of images to produce
    #[builder(default = 1)]
    pub n: u32,
    /// Output size
    #[builder(default)]
    pub size: ImageSize,
    /// Output format
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub response_format: Option<ImageResponseFormat>,
    /// End-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,
}

impl CreateImageRequest {
    /// Validates the parameters and describes the upstream call.
    pub fn into_operation(self) -> Result<Operation, OpenAIError> {
        validate_count(self.n)?;
        Operation::post(RequestType::ImageGenerations).params_from(&self)
    }
}

fn validate_count(n: u32) -> Result<(), OpenAIError> {
    if !(1..=MAX_IMAGES).contains(&n) {
        return Err(OpenAIError::InvalidParameter(format!(
            "n must be between 1 and {}, got {}",
            MAX_IMAGES, n
        )));
    }
    Ok(())
}

/// The result of an image operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Unix timestamp of creation
    #[serde(default)]
    pub created: Option<u64>,
    /// Generated images
    pub data: Vec<ImageData>,
}

impl ImageResponse {
    /// The url of the last returned image.
    pub fn url(&self) -> Option<&str> {
        self.data.last().and_then(|image| image.url.as_deref())
    }

    /// Every returned url, in response order.
    pub fn urls(&self) -> Vec<&str> {
        self.data
            .iter()
            .filter_map(|image| image.url.as_deref())
            .collect()
    }
}

/// One generated image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Temporary URL, for the `url` response format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64 PNG, for the `b64_json` response format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// The prompt the model actually used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

impl ImageData {
    /// Decodes the inline image, if one was returned.
    pub fn decode_b64(&self) -> Result<Option<Vec<u8>>, OpenAIError> {
        self.b64_json
            .as_deref()
            .map(|data| STANDARD.decode(data))
            .transpose()
            .map_err(OpenAIError::from)
    }
}
