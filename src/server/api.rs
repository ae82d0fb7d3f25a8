use crate::cli::Args;
use crate::llm::transcribe::TranscriptionClient;
use crate::models::api::{ ChatRequest, StreamEvent, TranscriptionResponse };
use crate::models::chat::ImageRef;
use crate::orchestrator::{ Orchestrator, ReplyStreams };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{ get, post },
    Json,
    Router,
    extract::{ Multipart, State },
    http::StatusCode,
    response::{ IntoResponse, Response },
    response::sse::{ Event, KeepAlive, Sse },
};
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{ mpsc, oneshot };
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    transcriber: Arc<dyn TranscriptionClient>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, transcriber: Arc<dyn TranscriptionClient>) -> Self {
        Self { orchestrator, transcriber }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/transcribe", post(transcribe_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(
    addr: &str,
    orchestrator: Arc<Orchestrator>,
    transcriber: Arc<dyn TranscriptionClient>,
    args: Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = app(AppState::new(orchestrator, transcriber));

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => (cert_path, key_path),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        };

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        info!("HTTP server listening on: http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.messages.is_empty() {
        return (StatusCode::BAD_REQUEST, "error: conversation must not be empty").into_response();
    }

    let reply = state.orchestrator.continue_conversation(req.messages);
    Sse::new(event_stream(reply)).keep_alive(KeepAlive::default()).into_response()
}

/// Multiplex the two reply signals onto one event stream. Fragments keep
/// their generation order; the image event lands whenever its signal
/// resolves; error and done are terminal.
fn event_stream(
    reply: ReplyStreams
) -> impl futures::Stream<Item = Result<Event, axum::Error>> {
    let (tx, rx) = mpsc::channel::<StreamEvent>(32);

    tokio::spawn(async move {
        let mut text = reply.text;
        let mut image_rx = Some(reply.image);

        loop {
            tokio::select! {
                fragment = text.next() => {
                    match fragment {
                        Some(Ok(content)) => {
                            if tx.send(StreamEvent::Fragment { content }).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            error!("Chat stream failed: {}", e);
                            let _ = tx.send(StreamEvent::Error {
                                message: format!("Stream error: {}", e),
                            }).await;
                            return;
                        }
                        None => break,
                    }
                }
                outcome = await_image_signal(&mut image_rx) => {
                    if let Some(image) = outcome {
                        if tx.send(StreamEvent::Image { url: image.url }).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        // Text is complete, so the exchange task is gone and the image
        // signal is settled; pick it up if the select loop never did.
        if let Some(image_rx) = image_rx {
            if let Ok(Some(image)) = image_rx.await {
                if tx.send(StreamEvent::Image { url: image.url }).await.is_err() {
                    return;
                }
            }
        }

        let _ = tx.send(StreamEvent::Done { timestamp: Utc::now().timestamp() }).await;
    });

    ReceiverStream::new(rx).map(|event| Event::default().json_data(&event))
}

/// Await the image signal once, consuming the receiver on completion. With
/// the receiver already taken (or never armed) this pends forever, leaving
/// the select loop to the text branch.
async fn await_image_signal(
    slot: &mut Option<oneshot::Receiver<Option<ImageRef>>>
) -> Option<ImageRef> {
    match slot.as_mut() {
        Some(receiver) => {
            let outcome = receiver.await.ok().flatten();
            *slot = None;
            outcome
        }
        None => std::future::pending().await,
    }
}

async fn transcribe_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (audio, mime_type) = match read_audio_field(&mut multipart).await {
        Ok(clip) => clip,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("error: {}", e)).into_response();
        }
    };

    match state.transcriber.transcribe(audio, &mime_type).await {
        Ok(transcript) => Json(TranscriptionResponse { transcript }).into_response(),
        Err(e) => {
            error!("Transcription failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("error: {}", e)).into_response()
        }
    }
}

async fn read_audio_field(
    multipart: &mut Multipart
) -> Result<(Vec<u8>, String), Box<dyn Error + Send + Sync>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or("audio/wav").to_string();
        let audio = field.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err("audio attachment is empty".into());
        }
        return Ok((audio, mime_type));
    }

    Err("request is missing an 'audio' attachment".into())
}
