pub mod openai;

use async_trait::async_trait;
use serde::{ Serialize, Deserialize };
use std::error::Error as StdError;
use std::sync::Arc;

use super::ProviderConfig;
use self::openai::OpenAITranscriptionClient;

/// Provider transcript payload, relayed to the caller as-is. `text` is the
/// recognized transcript; anything else the provider sends rides along.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Transcript {
    pub text: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe one complete audio clip. No chunking, no retry, no
    /// partial transcript.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str
    ) -> Result<Transcript, Box<dyn StdError + Send + Sync>>;
}

pub fn new_client(
    config: &ProviderConfig
) -> Result<Arc<dyn TranscriptionClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAITranscriptionClient::from_config(config)?;
    Ok(Arc::new(client))
}
