use async_trait::async_trait;
use log::info;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, AUTHORIZATION } };
use reqwest::multipart::{ Form, Part };
use std::error::Error as StdError;
use uuid::Uuid;

use super::{ Transcript, TranscriptionClient };
use crate::llm::ProviderConfig;

pub struct OpenAITranscriptionClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

impl OpenAITranscriptionClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let transcription_model = model.unwrap_or_else(|| "whisper-1".to_string());
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let mut headers = HeaderMap::new();
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
            model: transcription_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Transcription provider API key is required".to_string())?;

        Self::new(api_key, config.model.clone(), config.base_url.clone())
    }
}

/// Upload file extension for the clip's MIME type. Providers key format
/// detection off the file name, so the extension has to match the payload.
fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence {
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" => "m4a",
        "audio/flac" => "flac",
        _ => "wav",
    }
}

#[async_trait]
impl TranscriptionClient for OpenAITranscriptionClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str
    ) -> Result<Transcript, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));

        info!("Transcribing {} byte clip ({}) as {}", audio.len(), mime_type, file_name);

        let part = Part::bytes(audio)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| format!("Unsupported audio MIME type '{}': {}", mime_type, e))?;
        let form = Form::new().text("model", self.model.clone()).part("file", part);

        let transcript = self.http
            .post(&url)
            .multipart(form)
            .send().await?
            .error_for_status()?
            .json::<Transcript>().await?;

        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_tracks_mime_essence() {
        assert_eq!(extension_for("audio/ogg; codecs=opus"), "ogg");
        assert_eq!(extension_for("audio/webm"), "webm");
        assert_eq!(extension_for("audio/mpeg"), "mp3");
        assert_eq!(extension_for("application/octet-stream"), "wav");
    }
}
