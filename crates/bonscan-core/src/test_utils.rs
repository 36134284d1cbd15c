//! Test utilities for bonscan-core
//!
//! This module provides testing infrastructure including a mock provider
//! server that can be used for development and integration tests. It
//! answers the shared completion wire shape in either of the two response
//! forms (chat-completion or raw), or fails on demand.

use axum::{extract::Json, extract::State, http::StatusCode, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// How the mock server answers completion requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Chat-completion shape: {"choices":[{"message":{"content":...}}]}
    Chat,
    /// Raw shape: {"response":...}
    Raw,
    /// HTTP 500 on every request
    Fail,
    /// Answer with prose no parser recognizes
    Garbage,
}

/// Mock provider server for testing and development
pub struct MockProviderServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProviderServer {
    /// Start the mock server on an available port
    pub async fn start(mode: MockMode) -> Self {
        let app = Router::new()
            .route("/v1/chat/completions", post(handle_completion))
            .with_state(mode);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// The completion endpoint URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}/v1/chat/completions", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct CompletionRequest {
    #[allow(dead_code)]
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CompletionResponse {
    Chat { choices: Vec<Choice> },
    Raw { response: String },
}

#[derive(Debug, Serialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Serialize)]
struct ResponseMessage {
    role: String,
    content: String,
}

async fn handle_completion(
    State(mode): State<MockMode>,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, StatusCode> {
    let content = match mode {
        MockMode::Fail => return Err(StatusCode::INTERNAL_SERVER_ERROR),
        MockMode::Garbage => "Sorry, I could not make sense of that.".to_string(),
        MockMode::Chat | MockMode::Raw => mock_content(&request),
    };

    let response = match mode {
        MockMode::Raw => CompletionResponse::Raw { response: content },
        _ => CompletionResponse::Chat {
            choices: vec![Choice {
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content,
                },
            }],
        },
    };

    Ok(Json(response))
}

/// Produce a canned answer matching the request's prompt kind.
///
/// The system prompts name their output contract; that is what we sniff.
fn mock_content(request: &CompletionRequest) -> String {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    if system.contains("keyword-to-category") {
        // classify_products.md pattern
        r#"{"mappings":[{"keyword":"vollmilch","category":"Dairy"},{"keyword":"apfelschorle","category":"Beverages"}]}"#
            .to_string()
    } else {
        // extract_receipt.md pattern
        "| Name | Category | Price |\n|---|---|---|\n| Milch | Dairy | 1.29 |\n| Brezel | Bakery | 0.79 |"
            .to_string()
    }
}
