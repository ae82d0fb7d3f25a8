pub mod openai;

use async_trait::async_trait;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;

use super::ProviderConfig;
use crate::models::chat::ChatMessage;
use crate::tools::{ ToolCall, ToolSpec };
use self::openai::OpenAIChatClient;

pub type ChatEventStream = Pin<
    Box<dyn Stream<Item = Result<ChatEvent, Box<dyn StdError + Send + Sync>>> + Send>
>;

/// One item on a provider reply stream.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Text fragment, delivered in generation order.
    Fragment(String),
    /// A capability call, fully assembled from streamed deltas.
    ToolCall(ToolCall),
}

/// Message in the provider-level exchange. Unlike the caller-facing
/// `ChatMessage` this carries the tool-call plumbing follow-up rounds need;
/// provider clients map it onto their own wire shape.
#[derive(Debug, Clone)]
pub struct ExchangeMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ExchangeMessage {
    pub fn assistant(content: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: if content.is_empty() { None } else { Some(content) },
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(result.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

impl From<&ChatMessage> for ExchangeMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.to_string(),
            content: Some(msg.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Start one streamed model round over the given exchange, advertising
    /// the given capabilities. Provider failures before the first token
    /// surface as `Err`; failures mid-generation as an `Err` item.
    async fn stream_exchange(
        &self,
        messages: &[ExchangeMessage],
        tools: &[ToolSpec]
    ) -> Result<ChatEventStream, Box<dyn StdError + Send + Sync>>;
}

pub fn new_client(
    config: &ProviderConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
