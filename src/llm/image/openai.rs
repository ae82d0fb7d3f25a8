use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use url::Url;

use super::ImageClient;
use crate::llm::ProviderConfig;

pub struct OpenAIImageClient {
    http: HttpClient,
    model: String,
    size: String,
    base_url: String,
}

#[derive(Serialize)]
struct ImageGenerationRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl OpenAIImageClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        size: String
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let image_model = model.unwrap_or_else(|| "dall-e-3".to_string());
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: image_model,
            size,
            base_url: api_url,
        })
    }

    pub fn from_config(
        config: &ProviderConfig,
        size: &str
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Image provider API key is required".to_string())?;

        Self::new(api_key, config.model.clone(), config.base_url.clone(), size.to_string())
    }
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn generate(&self, description: &str) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/images/generations", self.base_url.trim_end_matches('/'));

        let req = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: description.to_string(),
            n: 1,
            size: self.size.clone(),
        };

        let resp = self.http
            .post(&url)
            .json(&req)
            .send().await?
            .error_for_status()?
            .json::<ImageGenerationResponse>().await?;

        let image_url = resp.data
            .first()
            .and_then(|image| image.url.clone())
            .ok_or_else(|| "No image URL in provider response".to_string())?;

        // Providers return hosted URLs; reject anything that doesn't parse.
        Url::parse(&image_url).map_err(|e| format!("Provider returned malformed image URL: {}", e))?;

        info!("Image generated by {}: {}", self.model, image_url);
        Ok(image_url)
    }
}
