use futures::{ Stream, StreamExt };
use log::{ info, warn };
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{ mpsc, oneshot };
use tokio_stream::wrappers::ReceiverStream;

use crate::cli::Args;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, ChatEvent, ExchangeMessage };
use crate::llm::image::{ new_client as new_image_client, ImageClient };
use crate::models::chat::{ Conversation, ImageRef };
use crate::tools::ToolRegistry;
use crate::tools::image::TextToImageTool;

/// Upper bound on model rounds per exchange. Each round after the first is
/// a follow-up carrying capability results back into context.
const MAX_TOOL_ROUNDS: usize = 4;

pub type TextStream = Pin<
    Box<dyn Stream<Item = Result<String, Box<dyn StdError + Send + Sync>>> + Send>
>;

/// The two independently observable reply signals for one exchange. The
/// image receiver resolves at most once; a closed channel means the
/// capability was never invoked.
pub struct ReplyStreams {
    pub text: TextStream,
    pub image: oneshot::Receiver<Option<ImageRef>>,
}

/// Process-wide conversation orchestrator. Holds one configured client
/// handle per provider, read-only after startup; all per-exchange state
/// lives in the task spawned by `continue_conversation`.
pub struct Orchestrator {
    chat_client: Arc<dyn ChatClient>,
    image_client: Arc<dyn ImageClient>,
}

impl Orchestrator {
    pub fn new(chat_client: Arc<dyn ChatClient>, image_client: Arc<dyn ImageClient>) -> Self {
        Self { chat_client, image_client }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_config = args.chat_provider();
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={:?}, BaseURL={:?}",
            chat_config.model.as_deref().unwrap_or("adapter default"),
            chat_config.base_url.as_deref().unwrap_or("adapter default")
        );

        let image_config = args.image_provider();
        let image_client = new_image_client(&image_config, &args.image_size)?;
        info!(
            "Image client configured: Model={:?}, Size={}, BaseURL={:?}",
            image_config.model.as_deref().unwrap_or("adapter default"),
            args.image_size,
            image_config.base_url.as_deref().unwrap_or("adapter default")
        );

        Ok(Self::new(chat_client, image_client))
    }

    /// Continue the given conversation. Returns immediately with the two
    /// reply handles; a spawned task drives the provider exchange, invoking
    /// capabilities between rounds and feeding their results back so the
    /// model can weave them into its continued reply.
    pub fn continue_conversation(&self, conversation: Conversation) -> ReplyStreams {
        let (tx, rx) = mpsc::channel(32);
        let (image_tx, image_rx) = oneshot::channel();

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TextToImageTool::new(self.image_client.clone(), image_tx)));

        let chat_client = Arc::clone(&self.chat_client);

        tokio::spawn(async move {
            let mut exchange: Vec<ExchangeMessage> = conversation
                .iter()
                .map(ExchangeMessage::from)
                .collect();
            let specs = registry.specs();
            let mut round = 0;

            loop {
                let mut stream = match chat_client.stream_exchange(&exchange, &specs).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };

                let mut reply_text = String::new();
                let mut calls = Vec::new();

                while let Some(event) = stream.next().await {
                    match event {
                        Ok(ChatEvent::Fragment(fragment)) => {
                            reply_text.push_str(&fragment);
                            if tx.send(Ok(fragment)).await.is_err() {
                                return;
                            }
                        }
                        Ok(ChatEvent::ToolCall(call)) => calls.push(call),
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }

                if calls.is_empty() {
                    return;
                }

                round += 1;
                if round >= MAX_TOOL_ROUNDS {
                    warn!("Capability round limit reached; ending exchange");
                    return;
                }

                exchange.push(ExchangeMessage::assistant(reply_text, calls.clone()));
                for call in calls {
                    info!("Dispatching capability '{}' (round {})", call.name, round);
                    let result = registry.dispatch(&call).await;
                    exchange.push(ExchangeMessage::tool_result(call.id, result));
                }
            }
        });

        ReplyStreams {
            text: Box::pin(ReceiverStream::new(rx)),
            image: image_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::llm::chat::ChatEventStream;
    use crate::models::chat::ChatMessage;
    use crate::tools::{ ToolCall, ToolSpec };

    /// Plays back one scripted event list per round and records the
    /// exchange it was asked to continue.
    struct ScriptedChatClient {
        rounds: Mutex<VecDeque<Vec<Result<ChatEvent, String>>>>,
        seen: Mutex<Vec<Vec<ExchangeMessage>>>,
    }

    impl ScriptedChatClient {
        fn new(rounds: Vec<Vec<Result<ChatEvent, String>>>) -> Self {
            Self {
                rounds: Mutex::new(rounds.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChatClient {
        async fn stream_exchange(
            &self,
            messages: &[ExchangeMessage],
            _tools: &[ToolSpec]
        ) -> Result<ChatEventStream, Box<dyn StdError + Send + Sync>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let round = self.rounds
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| "no scripted round left".to_string())?;
            let events: Vec<Result<ChatEvent, Box<dyn StdError + Send + Sync>>> = round
                .into_iter()
                .map(|event| event.map_err(|e| e.into()))
                .collect();
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    struct FakeImageClient {
        url: Option<String>,
    }

    #[async_trait]
    impl ImageClient for FakeImageClient {
        async fn generate(
            &self,
            _description: &str
        ) -> Result<String, Box<dyn StdError + Send + Sync>> {
            match &self.url {
                Some(url) => Ok(url.clone()),
                None => Err("provider unreachable".into()),
            }
        }
    }

    fn draw_call() -> ChatEvent {
        ChatEvent::ToolCall(ToolCall {
            id: "call_1".to_string(),
            name: "text_to_image".to_string(),
            arguments: r#"{"image_description":"a cat"}"#.to_string(),
        })
    }

    fn orchestrator(
        rounds: Vec<Vec<Result<ChatEvent, String>>>,
        image_url: Option<&str>
    ) -> (Orchestrator, Arc<ScriptedChatClient>) {
        let chat = Arc::new(ScriptedChatClient::new(rounds));
        let orchestrator = Orchestrator::new(
            chat.clone(),
            Arc::new(FakeImageClient { url: image_url.map(String::from) })
        );
        (orchestrator, chat)
    }

    async fn collect_text(mut stream: TextStream) -> (String, Option<String>) {
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => text.push_str(&fragment),
                Err(e) => {
                    return (text, Some(e.to_string()));
                }
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn plain_reply_streams_in_order_with_no_image() {
        let (orchestrator, _) = orchestrator(
            vec![
                vec![
                    Ok(ChatEvent::Fragment("Hello".to_string())),
                    Ok(ChatEvent::Fragment(" there".to_string()))
                ]
            ],
            Some("https://img.example/unused.png")
        );

        let reply = orchestrator.continue_conversation(vec![ChatMessage::user("Hello")]);
        let (text, err) = collect_text(reply.text).await;

        assert_eq!(text, "Hello there");
        assert!(err.is_none());
        // Capability never invoked: the sender is dropped, nothing resolves.
        assert!(reply.image.await.is_err());
    }

    #[tokio::test]
    async fn capability_call_resolves_image_and_continues_reply() {
        let (orchestrator, chat) = orchestrator(
            vec![
                vec![Ok(draw_call())],
                vec![Ok(ChatEvent::Fragment("Here is your cat.".to_string()))]
            ],
            Some("https://img.example/cat.png")
        );

        let reply = orchestrator.continue_conversation(vec![ChatMessage::user("Draw a cat")]);
        let (text, err) = collect_text(reply.text).await;

        assert_eq!(text, "Here is your cat.");
        assert!(err.is_none());
        assert_eq!(reply.image.await.unwrap().unwrap().url, "https://img.example/cat.png");

        // The follow-up round saw the assistant call and its result.
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let follow_up = &seen[1];
        assert_eq!(follow_up[1].role, "assistant");
        assert_eq!(follow_up[1].tool_calls.len(), 1);
        assert_eq!(follow_up[2].role, "tool");
        assert_eq!(follow_up[2].tool_call_id.as_deref(), Some("call_1"));
        assert!(follow_up[2].content.as_deref().unwrap().contains("imageUrl: https://"));
    }

    #[tokio::test]
    async fn image_failure_degrades_to_text_notice() {
        let (orchestrator, chat) = orchestrator(
            vec![
                vec![Ok(draw_call())],
                vec![Ok(ChatEvent::Fragment("Sorry, no image this time.".to_string()))]
            ],
            None
        );

        let reply = orchestrator.continue_conversation(vec![ChatMessage::user("Draw a cat")]);
        let (text, err) = collect_text(reply.text).await;

        assert_eq!(text, "Sorry, no image this time.");
        assert!(err.is_none());
        assert!(reply.image.await.unwrap().is_none());

        let seen = chat.seen.lock().unwrap();
        let result = seen[1][2].content.as_deref().unwrap();
        assert!(!result.is_empty());
        assert!(!result.contains("http"));
    }

    #[tokio::test]
    async fn provider_error_breaks_the_stream() {
        let (orchestrator, _) = orchestrator(
            vec![
                vec![Ok(ChatEvent::Fragment("Hel".to_string())), Err("quota exceeded".to_string())]
            ],
            Some("https://img.example/unused.png")
        );

        let reply = orchestrator.continue_conversation(vec![ChatMessage::user("Hello")]);
        let (text, err) = collect_text(reply.text).await;

        assert_eq!(text, "Hel");
        assert_eq!(err.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn round_limit_stops_a_looping_model() {
        // Model asks for an image every round; the exchange still ends.
        let rounds = (0..MAX_TOOL_ROUNDS).map(|_| vec![Ok(draw_call())]).collect();
        let (orchestrator, chat) = orchestrator(rounds, Some("https://img.example/cat.png"));

        let reply = orchestrator.continue_conversation(vec![ChatMessage::user("Draw a cat")]);
        let (_, err) = collect_text(reply.text).await;

        assert!(err.is_none());
        assert_eq!(chat.seen.lock().unwrap().len(), MAX_TOOL_ROUNDS);
        // First invocation still resolved the image signal.
        assert!(reply.image.await.unwrap().is_some());
    }
}
