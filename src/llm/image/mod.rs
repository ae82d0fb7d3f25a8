pub mod openai;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::ProviderConfig;
use self::openai::OpenAIImageClient;

#[async_trait]
pub trait ImageClient: Send + Sync {
    /// Generate one image from a text description and return its URL.
    async fn generate(&self, description: &str) -> Result<String, Box<dyn StdError + Send + Sync>>;
}

pub fn new_client(
    config: &ProviderConfig,
    size: &str
) -> Result<Arc<dyn ImageClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAIImageClient::from_config(config, size)?;
    Ok(Arc::new(client))
}
