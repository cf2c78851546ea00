//! Server-Sent-Events transport.
//!
//! Outbound frames are broadcast to every client subscribed to `GET /sse` as
//! `message` events. Inbound frames arrive one per `POST /messages` body.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mcp::transport::{lock, FrameHandler, Transport};
use crate::metrics::Metrics;

/// Outbound frames buffered per slow subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 1024;

/// Time allowed for open connections to drain on disconnect.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared handler state.
#[derive(Clone)]
pub struct SseState {
    on_message: FrameHandler,
    outgoing: broadcast::Sender<String>,
    closed: watch::Receiver<bool>,
    metrics: Arc<Metrics>,
}

/// Build the SSE router.
pub fn router(state: SseState) -> Router {
    Router::new()
        .route("/sse", get(subscribe))
        .route("/messages", post(post_message))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Event stream of outbound frames.
async fn subscribe(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session = Uuid::new_v4();
    debug!("SSE client subscribed: {}", session);
    let mut closed = state.closed.clone();
    let stream = BroadcastStream::new(state.outgoing.subscribe())
        .filter_map(move |frame| async move {
            match frame {
                Ok(frame) => Some(Ok::<_, Infallible>(
                    Event::default().event("message").data(frame),
                )),
                Err(e) => {
                    warn!("SSE client {} fell behind: {}", session, e);
                    None
                }
            }
        })
        .take_until(async move {
            let _ = closed.wait_for(|closed| *closed).await;
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Deliver one inbound frame.
async fn post_message(State(state): State<SseState>, body: String) -> impl IntoResponse {
    if *state.closed.borrow() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let frame = body.trim();
    if frame.is_empty() {
        return StatusCode::BAD_REQUEST;
    }
    (state.on_message)(frame.to_string()).await;
    StatusCode::ACCEPTED
}

/// Health check endpoint.
async fn health_check(State(state): State<SseState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "subscribers": state.outgoing.receiver_count()
    }))
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<SseState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// SSE transport.
pub struct SseTransport {
    addr: String,
    metrics: Arc<Metrics>,
    outgoing: broadcast::Sender<String>,
    closed: watch::Sender<bool>,
    connected: AtomicBool,
    server: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl SseTransport {
    /// Create a transport that will listen on `addr` once connected.
    pub fn new(addr: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        let (outgoing, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            addr: addr.into(),
            metrics,
            outgoing,
            closed: watch::Sender::new(false),
            connected: AtomicBool::new(false),
            server: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Bound address, once connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    fn state(&self, on_message: FrameHandler) -> SseState {
        SseState {
            on_message,
            outgoing: self.outgoing.clone(),
            closed: self.closed.subscribe(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self, on_message: FrameHandler) -> Result<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyConnected);
        }

        let listener = match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                return Err(Error::HttpServer(format!(
                    "Failed to bind {}: {}",
                    self.addr, e
                )));
            }
        };
        let local_addr = listener.local_addr()?;
        *lock(&self.local_addr) = Some(local_addr);

        let app = router(self.state(on_message));
        let mut closed = self.closed.subscribe();
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = closed.wait_for(|closed| *closed).await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("SSE server error: {}", e);
            }
        });
        *lock(&self.server) = Some(server);

        info!("SSE transport listening on http://{}/sse", local_addr);
        Ok(())
    }

    fn send(&self, frame: String) {
        if !self.connected.load(Ordering::SeqCst) {
            debug!("SSE transport disconnected; dropping frame");
            return;
        }
        if self.outgoing.send(frame).is_err() {
            debug!("No SSE subscribers; dropping frame");
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.closed.send_replace(true);

        let server = lock(&self.server).take();
        if let Some(server) = server {
            if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
                warn!("SSE server did not stop within {:?}", SHUTDOWN_GRACE);
            }
        }
        info!("SSE transport stopped");
        Ok(())
    }
}
