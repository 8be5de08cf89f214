//! OpenAI image generation provider
//!
//! Calls the images/generations endpoint with a blocking client. The
//! response carries either inline base64 image data or a download URL;
//! both paths end in a decoded RGB bitmap. Retry policy is deliberately
//! absent: one request, one outcome.

use super::ImageProvider;
use crate::types::{Error, Result};
use base64::Engine;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/images/generations";
const DEFAULT_MODEL: &str = "gpt-image-1";

/// Provider backed by the OpenAI image API.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    api_key: String,
    org_id: Option<String>,
    model: String,
    quality: String,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    quality: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            org_id: None,
            model: DEFAULT_MODEL.to_string(),
            quality: "auto".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Override the endpoint (test servers, proxies).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn fetch_bytes(&self, prompt: &str, width: u32, height: u32, timeout: Duration) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::UpstreamImage(format!("HTTP client: {}", e)))?;

        let payload = GenerationRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: format!("{}x{}", width, height),
            quality: &self.quality,
        };

        let mut request = client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload);
        if let Some(org_id) = &self.org_id {
            request = request.header("OpenAI-Organization", org_id);
        }

        let response = request
            .send()
            .map_err(|e| Error::UpstreamImage(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::UpstreamImage(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerationResponse = response
            .json()
            .map_err(|e| Error::UpstreamImage(format!("malformed response: {}", e)))?;
        let datum = parsed
            .data
            .first()
            .ok_or_else(|| Error::UpstreamImage("response carried no images".to_string()))?;

        if let Some(b64) = &datum.b64_json {
            return base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| Error::UpstreamImage(format!("base64 decode: {}", e)));
        }

        let url = datum
            .url
            .as_ref()
            .ok_or_else(|| Error::UpstreamImage("response carried neither data nor URL".to_string()))?;
        let download = client
            .get(url)
            .send()
            .map_err(|e| Error::UpstreamImage(format!("image download failed: {}", e)))?;
        if !download.status().is_success() {
            return Err(Error::UpstreamImage(format!(
                "image download returned {}",
                download.status()
            )));
        }
        download
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Error::UpstreamImage(format!("image download read: {}", e)))
    }
}

impl ImageProvider for OpenAiProvider {
    fn generate(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<RgbImage> {
        let bytes = self.fetch_bytes(prompt, width, height, timeout)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| Error::UpstreamImage(format!("undecodable image data: {}", e)))?;
        Ok(decoded.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let provider = OpenAiProvider::new("sk-test")
            .with_model("dall-e-3")
            .with_quality("hd")
            .with_org_id("org-1");
        assert_eq!(provider.model, "dall-e-3");
        assert_eq!(provider.quality, "hd");
        assert_eq!(provider.org_id.as_deref(), Some("org-1"));
        assert_eq!(provider.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_unreachable_endpoint_is_upstream_error() {
        let provider = OpenAiProvider::new("sk-test").with_api_url("http://127.0.0.1:1/v1/images");
        let result = provider.generate("brick", 64, 64, Duration::from_millis(200));
        assert!(matches!(result, Err(Error::UpstreamImage(_))));
    }
}
