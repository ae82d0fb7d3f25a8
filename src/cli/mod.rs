use clap::Parser;

use crate::llm::ProviderConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    // --- Chat Provider Args ---
    /// API key for the chat completion provider.
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o).
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Base URL for the chat provider API (for OpenAI-compatible vendors).
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    // --- Image Provider Args ---
    /// API key for the image generation provider. Defaults to CHAT_API_KEY if not set.
    #[arg(long, env = "IMAGE_API_KEY")]
    pub image_api_key: Option<String>,

    /// Model name for image generation (e.g., dall-e-3).
    #[arg(long, env = "IMAGE_MODEL")]
    pub image_model: Option<String>,

    /// Base URL for the image provider API. Defaults to CHAT_BASE_URL if not set.
    #[arg(long, env = "IMAGE_BASE_URL")]
    pub image_base_url: Option<String>,

    /// Pixel size of generated images (e.g., 1024x1024).
    #[arg(long, env = "IMAGE_SIZE", default_value = "1024x1024")]
    pub image_size: String,

    // --- Transcription Provider Args ---
    /// API key for the speech-to-text provider. Defaults to CHAT_API_KEY if not set.
    #[arg(long, env = "TRANSCRIBE_API_KEY")]
    pub transcribe_api_key: Option<String>,

    /// Model name for speech-to-text (e.g., whisper-1).
    #[arg(long, env = "TRANSCRIBE_MODEL")]
    pub transcribe_model: Option<String>,

    /// Base URL for the speech-to-text provider API. Defaults to CHAT_BASE_URL if not set.
    #[arg(long, env = "TRANSCRIBE_BASE_URL")]
    pub transcribe_base_url: Option<String>,

    /// Optional path to the TLS certificate file (PEM format) for serving HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for serving HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn chat_provider(&self) -> ProviderConfig {
        ProviderConfig::new(
            Some(self.chat_api_key.clone()),
            self.chat_model.clone(),
            self.chat_base_url.clone()
        )
    }

    /// Image generation runs against the chat provider unless overridden.
    pub fn image_provider(&self) -> ProviderConfig {
        ProviderConfig::new(
            self.image_api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| Some(self.chat_api_key.clone())),
            self.image_model.clone(),
            self.image_base_url.clone().or_else(|| self.chat_base_url.clone())
        )
    }

    pub fn transcribe_provider(&self) -> ProviderConfig {
        ProviderConfig::new(
            self.transcribe_api_key
                .clone()
                .filter(|k| !k.is_empty())
                .or_else(|| Some(self.chat_api_key.clone())),
            self.transcribe_model.clone(),
            self.transcribe_base_url.clone().or_else(|| self.chat_base_url.clone())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_and_transcription_fall_back_to_chat_credentials() {
        let args = Args::parse_from([
            "sketch-agent",
            "--chat-api-key",
            "sk-chat",
            "--chat-base-url",
            "https://llm.internal",
        ]);

        let image = args.image_provider();
        assert_eq!(image.api_key.as_deref(), Some("sk-chat"));
        assert_eq!(image.base_url.as_deref(), Some("https://llm.internal"));

        let transcribe = args.transcribe_provider();
        assert_eq!(transcribe.api_key.as_deref(), Some("sk-chat"));
    }

    #[test]
    fn explicit_provider_settings_win() {
        let args = Args::parse_from([
            "sketch-agent",
            "--chat-api-key",
            "sk-chat",
            "--transcribe-api-key",
            "sk-audio",
            "--transcribe-base-url",
            "https://stt.internal",
        ]);

        let transcribe = args.transcribe_provider();
        assert_eq!(transcribe.api_key.as_deref(), Some("sk-audio"));
        assert_eq!(transcribe.base_url.as_deref(), Some("https://stt.internal"));
    }

    #[test]
    fn blank_chat_key_yields_none() {
        let args = Args::parse_from(["sketch-agent", "--chat-api-key", ""]);
        assert!(args.chat_provider().api_key.is_none());
    }
}
