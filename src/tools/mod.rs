pub mod image;

use async_trait::async_trait;
use log::warn;
use serde::{ Serialize, Deserialize };
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capability advertised to the model: a name, what it does, and a JSON
/// Schema describing its arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A structured call the model emitted mid-generation, assembled from
/// streamed deltas. `arguments` is the raw JSON string as the provider
/// sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no capability named '{0}' is available")]
    Unknown(String),
    #[error("invalid arguments for '{name}': {message}")]
    InvalidArguments {
        name: String,
        message: String,
    },
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Perform the capability. The returned string is handed back to the
    /// model verbatim; handlers fold provider failures into human-readable
    /// text themselves and only error on malformed calls.
    async fn invoke(&self, arguments: &str) -> Result<String, ToolError>;
}

/// Lookup table mapping capability name to handler. Built per exchange so
/// handlers can carry per-request completion signals.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(handler.spec().name, handler);
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|handler| handler.spec()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one call. Every failure is folded into the result string:
    /// the model gets told what went wrong and generation continues.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let handler = match self.tools.get(&call.name) {
            Some(handler) => handler,
            None => {
                warn!("Model requested unregistered capability '{}'", call.name);
                return ToolError::Unknown(call.name.clone()).to_string();
            }
        };

        match handler.invoke(&call.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Capability '{}' rejected call {}: {}", call.name, call.id, e);
                e.to_string()
            }
        }
    }
}
