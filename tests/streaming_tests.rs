//! Streaming relay functionality tests

mod common;

use common::{deltas, rate_limited, server_error, Script, ScriptedUpstream};
use flowrelay::client::StreamFolder;
use flowrelay::config::ModelsConfig;
use flowrelay::models::openai::ChatStreamChunk;
use flowrelay::models::{GenerationRequest, WireEvent};
use flowrelay::providers::openai::sse_chunks;
use flowrelay::providers::UpstreamError;
use flowrelay::services::{PumpOutcome, RelayService};
use flowrelay::utils::error::AppError;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

const FLASH: &str = "google/gemini-3-flash";
const PRO: &str = "google/gemini-3-pro";
const FLASH_25: &str = "google/gemini-2.5-flash";

fn relay(upstream: Arc<ScriptedUpstream>) -> RelayService {
    RelayService::new(upstream, ModelsConfig::default())
}

fn request(model: Option<&str>) -> GenerationRequest {
    GenerationRequest::new("Say hi", model.map(str::to_string)).unwrap()
}

async fn drain(mut rx: mpsc::Receiver<WireEvent>) -> Vec<WireEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[test]
fn test_candidate_order() {
    let service = relay(Arc::new(ScriptedUpstream::new()));

    assert_eq!(service.candidates(&request(None)), vec![FLASH, PRO, FLASH_25]);
    assert_eq!(service.candidates(&request(Some(PRO))), vec![PRO, FLASH, FLASH_25]);
    assert_eq!(
        service.candidates(&request(Some("meta/llama"))),
        vec!["meta/llama", FLASH, PRO, FLASH_25]
    );
}

#[tokio::test]
async fn test_k_failures_then_success() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .with(FLASH, server_error())
            .with(PRO, rate_limited())
            .with(FLASH_25, Script::Stream(deltas(&["ok"]))),
    );
    let service = relay(upstream.clone());

    let active = service.open(&request(None)).await.unwrap();

    assert_eq!(active.model(), FLASH_25);
    assert_eq!(upstream.calls(), vec![FLASH, PRO, FLASH_25]);
}

#[tokio::test]
async fn test_success_stops_trying() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .with(FLASH, Script::Stream(deltas(&["ok"])))
            .with(PRO, Script::Stream(deltas(&["never"]))),
    );
    let service = relay(upstream.clone());

    service.open(&request(None)).await.unwrap();
    assert_eq!(upstream.calls(), vec![FLASH]);
}

#[tokio::test]
async fn test_requested_model_duplicate_not_retried() {
    let upstream = Arc::new(ScriptedUpstream::new());
    let service = relay(upstream.clone());

    let error = service.open(&request(Some(PRO))).await.unwrap_err();

    assert!(matches!(error, AppError::AllModelsExhausted { .. }));
    assert_eq!(upstream.calls(), vec![PRO, FLASH, FLASH_25]);
}

#[tokio::test]
async fn test_pump_emits_sanitized_deltas_then_terminal() {
    let upstream = Arc::new(
        ScriptedUpstream::new().with(FLASH, Script::Stream(deltas(&["<s>Hel", "", "lo!</s>", "</s>"]))),
    );
    let active = relay(upstream).open(&request(None)).await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let outcome = active.pump(tx, CancellationToken::new()).await;

    assert_eq!(outcome, PumpOutcome::Completed { deltas: 2 });
    assert_eq!(
        drain(rx).await,
        vec![
            WireEvent::ContentDelta("Hel".to_string()),
            WireEvent::ContentDelta("lo!".to_string()),
            WireEvent::Terminal,
        ]
    );
}

#[tokio::test]
async fn test_pump_upstream_failure_has_no_terminal() {
    let mut items = deltas(&["part"]);
    items.push(Err(UpstreamError::Transport("connection reset".to_string())));
    let upstream = Arc::new(ScriptedUpstream::new().with(FLASH, Script::Stream(items)));
    let active = relay(upstream).open(&request(None)).await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let outcome = active.pump(tx, CancellationToken::new()).await;

    assert!(matches!(outcome, PumpOutcome::UpstreamFailed { deltas: 1, .. }));
    let events = drain(rx).await;
    assert_eq!(events, vec![WireEvent::ContentDelta("part".to_string())]);
}

#[tokio::test]
async fn test_pump_stops_when_receiver_dropped() {
    let (dropped_tx, dropped_rx) = oneshot::channel();
    let upstream = Arc::new(ScriptedUpstream::new().with(
        FLASH,
        Script::Hang {
            chunks: vec![ChatStreamChunk::from_content("first")],
            dropped: Some(dropped_tx),
        },
    ));
    let active = relay(upstream).open(&request(None)).await.unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let pump = tokio::spawn(active.pump(tx, CancellationToken::new()));

    assert_eq!(rx.recv().await, Some(WireEvent::ContentDelta("first".to_string())));
    drop(rx);

    assert_eq!(pump.await.unwrap(), PumpOutcome::ClientGone { deltas: 1 });
    // Upstream stream released with the pump
    assert!(dropped_rx.await.is_err());
}

#[tokio::test]
async fn test_pump_stops_on_cancel() {
    let upstream = Arc::new(ScriptedUpstream::new().with(
        FLASH,
        Script::Hang {
            chunks: vec![],
            dropped: None,
        },
    ));
    let active = relay(upstream).open(&request(None)).await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let pump = tokio::spawn(active.pump(tx, cancel.clone()));
    cancel.cancel();

    assert_eq!(pump.await.unwrap(), PumpOutcome::Cancelled { deltas: 0 });
    assert!(drain(rx).await.is_empty());
}

/// Provider bytes -> relay events -> consumer fold, with deliberately awkward chunking
#[tokio::test]
async fn test_provider_to_consumer_round_trip() {
    let provider_body = concat!(
        ": OPENROUTER PROCESSING\n\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Grüße\"}}]}\r\n\r\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\", <s>world\"}}]}\n\n",
        "data: {\"id\":\"gen-1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    )
    .as_bytes();

    // Three-byte pieces cut through both events and multi-byte characters
    let pieces: Vec<Result<Vec<u8>, std::io::Error>> =
        provider_body.chunks(3).map(|c| Ok(c.to_vec())).collect();
    let chunks: Vec<_> = sse_chunks(futures::stream::iter(pieces)).collect().await;

    let mut wire = String::new();
    for chunk in chunks {
        let chunk = chunk.unwrap();
        let delta = flowrelay::services::sanitize_delta(chunk.content_delta());
        if !delta.is_empty() {
            wire.push_str(&WireEvent::ContentDelta(delta).encode());
        }
    }
    wire.push_str(&WireEvent::Terminal.encode());

    let mut folder = StreamFolder::new();
    for piece in wire.as_bytes().chunks(5) {
        folder.push(piece);
    }

    assert!(folder.saw_terminal());
    assert_eq!(folder.deltas(), 2);
    assert_eq!(folder.finish(), "Grüße, world");
}
