pub mod cli;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod server;
pub mod tools;

use cli::Args;
use llm::transcribe::new_client as new_transcription_client;
use log::info;
use orchestrator::Orchestrator;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Image Model: {}", args.image_model.as_deref().unwrap_or("adapter default"));
    info!("Image Size: {}", args.image_size);
    info!("Transcription Model: {}", args.transcribe_model.as_deref().unwrap_or("adapter default"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let orchestrator = Arc::new(Orchestrator::from_args(&args)?);
    let transcriber = new_transcription_client(&args.transcribe_provider())?;
    info!(
        "Transcription client configured: Model={:?}, BaseURL={:?}",
        args.transcribe_model.as_deref().unwrap_or("adapter default"),
        args.transcribe_base_url.as_deref().unwrap_or("adapter default")
    );

    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, orchestrator, transcriber, args);
    server.run().await?;

    Ok(())
}
