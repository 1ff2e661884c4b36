//! Shared test fixtures: a scripted upstream and a relay bound to a local port

#![allow(dead_code)]

use async_trait::async_trait;
use flowrelay::config::Settings;
use flowrelay::handlers::create_router_with_upstream;
use flowrelay::models::openai::ChatStreamChunk;
use flowrelay::providers::{BoxStream, Upstream, UpstreamError};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// What the fake upstream does for one model
pub enum Script {
    /// Refuse to open the stream
    Reject(UpstreamError),
    /// Emit these items, then end
    Stream(Vec<Result<ChatStreamChunk, UpstreamError>>),
    /// Emit these items, then never end; `dropped` fires when the relay
    /// drops the stream
    Hang {
        chunks: Vec<ChatStreamChunk>,
        dropped: Option<oneshot::Sender<()>>,
    },
}

/// Upstream that answers per model from a script and records every attempt
#[derive(Default)]
pub struct ScriptedUpstream {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, model: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(model.to_string(), script);
        self
    }

    /// Models attempted, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn deltas(parts: &[&str]) -> Vec<Result<ChatStreamChunk, UpstreamError>> {
    parts.iter().map(|p| Ok(ChatStreamChunk::from_content(*p))).collect()
}

pub fn rate_limited() -> Script {
    Script::Reject(UpstreamError::RateLimited("quota exhausted".to_string()))
}

pub fn server_error() -> Script {
    Script::Reject(UpstreamError::Status {
        status: 500,
        message: "internal".to_string(),
    })
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_stream(
        &self,
        model: &str,
        _prompt: &str,
    ) -> Result<BoxStream<'static, ChatStreamChunk>, UpstreamError> {
        self.calls.lock().unwrap().push(model.to_string());

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(model) {
            None => Err(UpstreamError::Status {
                status: 404,
                message: format!("unknown model {}", model),
            }),
            Some(Script::Reject(error)) => Err(error.clone()),
            Some(Script::Stream(items)) => Ok(Box::pin(futures::stream::iter(items.clone()))),
            Some(Script::Hang { chunks, dropped }) => {
                let head = futures::stream::iter(chunks.clone().into_iter().map(Ok));
                let guard = dropped.take();
                // The guard lives in the stream state and is released on drop
                let tail = futures::stream::unfold(guard, |guard| async move {
                    futures::future::pending::<()>().await;
                    Some((Ok(ChatStreamChunk::default()), guard))
                });
                Ok(Box::pin(head.chain(tail)))
            }
        }
    }
}

pub fn test_settings() -> Settings {
    Settings::for_upstream("http://127.0.0.1:9", "sk-or-test-key")
}

/// Serve the relay on an ephemeral port; returns the `/api/ask-ai` URL
pub async fn spawn_relay(upstream: Arc<dyn Upstream>) -> (String, CancellationToken) {
    let shutdown = CancellationToken::new();
    let app = create_router_with_upstream(test_settings(), upstream, shutdown.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/ask-ai", addr), shutdown)
}
