//! Async client for the Kontext image-generation endpoint.
//!
//! Wraps a single `POST {base}/api/generate` call: multipart upload of a
//! prompt, one image file, and zero or more style tags; the response body is
//! the generated image.

use reqwest::{multipart, Client};
use shared::{ApiFailure, ErrorBody};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const GENERATE_PATH: &str = "/api/generate";
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid server URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("{0}")]
    Api(ApiFailure),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One image file queued for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: ImageUpload,
    /// Checked style tags, in picker order. Not deduplicated.
    pub styles: Vec<String>,
}

/// Result of a successful generation: the raw image body plus the
/// `Content-Type` the server declared for it, if any.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub struct GenerationClient {
    http: Client,
    base_url: String,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GenerateError> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|source| GenerateError::InvalidBaseUrl {
            url: base_url.clone(),
            source,
        })?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues exactly one multipart POST and returns the generated image.
    ///
    /// Non-2xx statuses are mapped to `GenerateError::Api`, carrying the
    /// server's `detail` message when the body parses as JSON.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedImage, GenerateError> {
        let GenerationRequest {
            prompt,
            image,
            styles,
        } = request;

        let mime = image
            .mime_type
            .unwrap_or_else(|| FALLBACK_MIME.to_string());
        let image_part = multipart::Part::bytes(image.bytes)
            .file_name(image.filename)
            .mime_str(&mime)?;

        let mut form = multipart::Form::new()
            .text("prompt", prompt)
            .part("image", image_part);
        for style in styles {
            form = form.text("styles", style);
        }

        debug!(endpoint = GENERATE_PATH, "submitting generation request");
        let response = self
            .http
            .post(format!("{}{GENERATE_PATH}", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.ok();
            let failure = ApiFailure::from_body(status.as_u16(), body);
            warn!(status = status.as_u16(), message = %failure, "generation rejected");
            return Err(GenerateError::Api(failure));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await?.to_vec();
        debug!(size_bytes = bytes.len(), "generation succeeded");
        Ok(GeneratedImage {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
