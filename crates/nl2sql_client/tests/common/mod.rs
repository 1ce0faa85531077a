//! In-process fake engine shared by the integration tests. Serves the three
//! engine endpoints from an axum router on a loopback port. No mocks.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use nl2sql_client::{Config, EngineSection, StreamSection};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct FakeEngine {
    pub healthy: bool,
    /// `None` answers the listing with 404. Shared so it can change after spawn.
    catalog: Arc<Mutex<Option<Value>>>,
    catalog_fetches: Arc<AtomicUsize>,
    pub answer: Vec<Vec<u8>>,
    pub stream_status: StatusCode,
    pub chunk_delay: Duration,
    /// Hold the connection open instead of sending chunk `n` and beyond.
    pub stall_after: Option<usize>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            healthy: true,
            catalog: Arc::new(Mutex::new(Some(json!([
                { "alias": "noaa", "id": "id1" },
                { "alias": "gdelt", "id": "id2" }
            ])))),
            catalog_fetches: Arc::new(AtomicUsize::new(0)),
            answer: vec![
                b"Thought: I should query the weather table.\n".to_vec(),
                b"Final Answer: 42".to_vec(),
            ],
            stream_status: StatusCode::OK,
            chunk_delay: Duration::ZERO,
            stall_after: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn with_catalog(self, catalog: Option<Value>) -> Self {
        self.set_catalog(catalog);
        self
    }

    /// Replace the listing served from now on, also for running engines.
    pub fn set_catalog(&self, catalog: Option<Value>) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub fn catalog_fetches(&self) -> usize {
        self.catalog_fetches.load(Ordering::SeqCst)
    }

    pub fn with_answer(mut self, chunks: &[&str]) -> Self {
        self.answer = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self
    }

    pub fn with_raw_answer(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.answer = chunks;
        self
    }

    pub fn with_stream_status(mut self, status: StatusCode) -> Self {
        self.stream_status = status;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn stalling_after(mut self, chunks: usize) -> Self {
        self.stall_after = Some(chunks);
        self
    }

    /// Bodies of every generation request received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompt_texts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r["prompt"]["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn router(self) -> Router {
        Router::new()
            .route("/api/v1/heartbeat", get(heartbeat))
            .route("/api/v1/database-connections", get(database_connections))
            .route("/api/v1/stream-sql-generation", post(stream_sql_generation))
            .with_state(self)
    }
}

async fn heartbeat(State(engine): State<FakeEngine>) -> StatusCode {
    if engine.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn database_connections(State(engine): State<FakeEngine>) -> Response {
    engine.catalog_fetches.fetch_add(1, Ordering::SeqCst);
    let catalog = engine.catalog.lock().unwrap().clone();
    match catalog {
        Some(catalog) => Json(catalog).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn stream_sql_generation(
    State(engine): State<FakeEngine>,
    Json(body): Json<Value>,
) -> Response {
    engine.requests.lock().unwrap().push(body);
    if !engine.stream_status.is_success() {
        return (engine.stream_status, "generation failed").into_response();
    }
    let delay = engine.chunk_delay;
    let stall_after = engine.stall_after;
    let chunks = futures_util::stream::iter(engine.answer.into_iter().enumerate()).then(
        move |(index, chunk)| async move {
            if stall_after.is_some_and(|n| index >= n) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, std::io::Error>(Bytes::from(chunk))
        },
    );
    Response::new(Body::from_stream(chunks))
}

/// Serve `engine` on the current tokio runtime. Returns its base URL.
pub async fn spawn(engine: FakeEngine) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, engine.router()).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Serve `engine` from a background thread with its own runtime, for tests
/// that drive the binary. Returns its base URL.
pub fn spawn_in_thread(engine: FakeEngine) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, engine.router()).await.unwrap();
        });
    });
    format!("http://{}", addr)
}

/// A loopback URL where nothing is listening.
pub fn refused_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Config pointing at `base_url` with pacing disabled and short timeouts.
/// Tests that exercise pacing set `stream.chunk_delay_ms` themselves.
pub fn test_config(base_url: &str) -> Config {
    Config {
        engine: EngineSection {
            base_url: Some(base_url.to_string()),
            request_timeout_secs: Some(5),
            connect_timeout_secs: Some(2),
            ..EngineSection::default()
        },
        stream: StreamSection {
            chunk_delay_ms: Some(0),
            timeout_secs: Some(10),
            ..StreamSection::default()
        },
    }
}
