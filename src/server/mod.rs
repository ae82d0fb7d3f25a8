pub mod api;

use crate::cli::Args;
use crate::llm::transcribe::TranscriptionClient;
use crate::orchestrator::Orchestrator;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    addr: String,
    orchestrator: Arc<Orchestrator>,
    transcriber: Arc<dyn TranscriptionClient>,
    args: Args,
}

impl Server {
    pub fn new(
        addr: String,
        orchestrator: Arc<Orchestrator>,
        transcriber: Arc<dyn TranscriptionClient>,
        args: Args
    ) -> Self {
        Self {
            addr,
            orchestrator,
            transcriber,
            args,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::serve(
            &self.addr,
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.transcriber),
            self.args.clone()
        ).await
    }
}
