use async_trait::async_trait;
use log::{ info, error };
use serde::Deserialize;
use serde_json::json;
use std::sync::{ Arc, Mutex };
use tokio::sync::oneshot;

use super::{ ToolError, ToolHandler, ToolSpec };
use crate::llm::image::ImageClient;
use crate::models::chat::ImageRef;

pub const TEXT_TO_IMAGE: &str = "text_to_image";

const GENERATION_FAILED: &str = "couldn't generate an image for that description";

#[derive(Deserialize)]
struct TextToImageArgs {
    image_description: String,
}

/// The one capability offered to the model: turn a text description into an
/// image URL. Besides returning the result string to the model, the first
/// invocation resolves the exchange's image signal; the sender is consumed
/// so later invocations can only feed text back.
pub struct TextToImageTool {
    client: Arc<dyn ImageClient>,
    signal: Mutex<Option<oneshot::Sender<Option<ImageRef>>>>,
}

impl TextToImageTool {
    pub fn new(client: Arc<dyn ImageClient>, signal: oneshot::Sender<Option<ImageRef>>) -> Self {
        Self {
            client,
            signal: Mutex::new(Some(signal)),
        }
    }

    fn resolve(&self, outcome: Option<ImageRef>) {
        let sender = self.signal.lock().expect("image signal lock poisoned").take();
        if let Some(sender) = sender {
            // Receiver may already be gone if the caller hung up.
            let _ = sender.send(outcome);
        }
    }
}

#[async_trait]
impl ToolHandler for TextToImageTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TEXT_TO_IMAGE.to_string(),
            description:
                "Takes a text description of an image and returns a url to an image matching the description".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "image_description": {
                        "type": "string",
                        "description": "The text description of an image that will be generated"
                    }
                },
                "required": ["image_description"]
            }),
        }
    }

    async fn invoke(&self, arguments: &str) -> Result<String, ToolError> {
        let args: TextToImageArgs = serde_json
            ::from_str(arguments)
            .map_err(|e| ToolError::InvalidArguments {
                name: TEXT_TO_IMAGE.to_string(),
                message: e.to_string(),
            })?;

        info!("Generating image for description: {}", args.image_description);

        match self.client.generate(&args.image_description).await {
            Ok(url) => {
                self.resolve(Some(ImageRef { url: url.clone() }));
                Ok(format!("imageUrl: {}", url))
            }
            Err(e) => {
                error!("Image generation failed: {}", e);
                self.resolve(None);
                Ok(GENERATION_FAILED.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    struct FakeImageClient {
        url: Option<String>,
    }

    #[async_trait]
    impl ImageClient for FakeImageClient {
        async fn generate(&self, _description: &str) -> Result<String, Box<dyn StdError + Send + Sync>> {
            match &self.url {
                Some(url) => Ok(url.clone()),
                None => Err("provider unreachable".into()),
            }
        }
    }

    #[tokio::test]
    async fn success_returns_url_and_resolves_signal() {
        let (tx, rx) = oneshot::channel();
        let tool = TextToImageTool::new(
            Arc::new(FakeImageClient { url: Some("https://img.example/cat.png".to_string()) }),
            tx,
        );

        let result = tool.invoke(r#"{"image_description":"a cat"}"#).await.unwrap();
        assert_eq!(result, "imageUrl: https://img.example/cat.png");

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.unwrap().url, "https://img.example/cat.png");
    }

    #[tokio::test]
    async fn failure_returns_notice_without_url() {
        let (tx, rx) = oneshot::channel();
        let tool = TextToImageTool::new(Arc::new(FakeImageClient { url: None }), tx);

        let result = tool.invoke(r#"{"image_description":"a cat"}"#).await.unwrap();
        assert!(!result.is_empty());
        assert!(!result.contains("http"));

        assert!(rx.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected() {
        let (tx, _rx) = oneshot::channel();
        let tool = TextToImageTool::new(
            Arc::new(FakeImageClient { url: Some("https://img.example/cat.png".to_string()) }),
            tx,
        );

        let err = tool.invoke("not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn signal_resolves_only_once() {
        let (tx, mut rx) = oneshot::channel();
        let tool = TextToImageTool::new(
            Arc::new(FakeImageClient { url: Some("https://img.example/cat.png".to_string()) }),
            tx,
        );

        tool.invoke(r#"{"image_description":"a cat"}"#).await.unwrap();
        tool.invoke(r#"{"image_description":"a dog"}"#).await.unwrap();

        // First outcome wins; the second invocation only returned text.
        assert!(rx.try_recv().unwrap().is_some());
    }
}
