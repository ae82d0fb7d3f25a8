use serde::{ Serialize, Deserialize };

use crate::llm::transcribe::Transcript;
use crate::models::chat::Conversation;

/// Body of `POST /api/chat`: the full conversation so far.
#[derive(Serialize, Deserialize, Debug)]
pub struct ChatRequest {
    pub messages: Conversation,
}

/// One event on the chat response stream. Fragments arrive in generation
/// order; the image event may land anywhere relative to them; error and
/// done are terminal.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "fragment")] Fragment {
        content: String,
    },
    #[serde(rename = "image")] Image {
        url: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "done")] Done {
        timestamp: i64,
    },
}

/// Success body of `POST /api/transcribe`, relaying the provider payload.
#[derive(Serialize, Deserialize, Debug)]
pub struct TranscriptionResponse {
    pub transcript: Transcript,
}
