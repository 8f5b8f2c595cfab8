//! Shared helpers for router-level and end-to-end tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use product_content_api::app_state::AppState;
use product_content_api::routes::api_router;
use product_content_api::services::generator::ImageGenerator;
use product_content_api::services::image_store::ImageStore;
use product_content_api::services::llm::{
    ChatCompletion, ChatModel, ChatRequest, LlmError, Usage,
};

/// How the stub model answers every completion
#[derive(Debug, Clone)]
pub enum StubReply {
    Text(&'static str),
    Unavailable,
}

/// Chat model that returns a canned reply and records what it was asked
pub struct StubChatModel {
    reply: StubReply,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl StubChatModel {
    pub fn new(reply: StubReply) -> (Self, Arc<Mutex<Vec<ChatRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                reply,
                requests: requests.clone(),
            },
            requests,
        )
    }

    pub fn replying(text: &'static str) -> Self {
        Self::new(StubReply::Text(text)).0
    }
}

#[async_trait]
impl ChatModel for StubChatModel {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.reply {
            StubReply::Text(text) => Ok(ChatCompletion {
                content: text.to_string(),
                usage: Some(Usage {
                    prompt_tokens: 120,
                    completion_tokens: 80,
                    total_tokens: 200,
                }),
            }),
            StubReply::Unavailable => Err(LlmError::Status {
                status: 503,
                body: "model is loading".to_string(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        match self.reply {
            StubReply::Text(_) => Ok(()),
            StubReply::Unavailable => Err(LlmError::EmptyResponse),
        }
    }
}

/// Generator whose interpreter does not exist, so it is never ready
pub fn unavailable_generator(root: &Path) -> ImageGenerator {
    ImageGenerator::new(
        "definitely-not-an-interpreter-7f3a",
        root.join("generar_cli.py"),
        root.join("imagenes"),
        root.join("metadata"),
        Duration::from_secs(5),
    )
}

/// Application state over a scratch directory
pub fn test_state(model: StubChatModel, root: &Path) -> AppState {
    std::fs::create_dir_all(root.join("imagenes")).unwrap();
    std::fs::create_dir_all(root.join("metadata")).unwrap();
    let images = ImageStore::new(root.join("imagenes"), root.join("metadata"));
    AppState::new(model, unavailable_generator(root), images)
}

pub fn test_router(model: StubChatModel, root: &Path) -> Router {
    api_router(test_state(model, root))
}

/// Drive one request through the router and decode the JSON body
pub async fn send_json(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Base URL of a running server for the ignored end-to-end tests
pub fn get_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// POST a JSON body to a running server
pub async fn post_live(
    client: &reqwest::Client,
    base_url: &str,
    path: &str,
    body: &Value,
) -> Result<(u16, Value), Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}{}", base_url, path))
        .json(body)
        .send()
        .await?;
    let status = response.status().as_u16();
    let value = response.json::<Value>().await?;
    Ok((status, value))
}
