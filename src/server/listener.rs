//! HTTP listener on a dedicated thread
//!
//! The listener only decodes, counts and enqueues. Handlers await the reply
//! channel of their queued request; they never touch registry or host state.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tokio::sync::oneshot;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::error::{Result, INTERNAL_ERROR};
use crate::mcp::{McpRequest, McpResponse};

use super::{RequestQueue, ServerStats};

/// Shared state of the HTTP handlers
#[derive(Clone)]
struct ListenerState {
    queue: RequestQueue,
    stats: Arc<ServerStats>,
}

/// Build the router
pub fn router(queue: RequestQueue, stats: Arc<ServerStats>) -> Router {
    Router::new()
        .route("/", post(rpc_handler).options(preflight_handler))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, GET, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(ListenerState { queue, stats })
}

/// CORS preflight: answered here, never queued or counted
async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// JSON-RPC endpoint
async fn rpc_handler(State(state): State<ListenerState>, body: Bytes) -> Response {
    let request: McpRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Undecodable request body: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(McpResponse::decode_failure(e)),
            )
                .into_response();
        }
    };

    state.stats.record(&request.method);
    tracing::debug!(method = %request.method, "Request queued");

    let id = request.id.clone();
    match state.queue.enqueue(request).await {
        Ok(response) => Json(response).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(McpResponse::error(
                id,
                INTERNAL_ERROR,
                "Server stopped before the request was processed",
                None,
            )),
        )
            .into_response(),
    }
}

/// Running accept loop
pub struct Listener {
    addr: SocketAddr,
    queue: RequestQueue,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Listener {
    /// Bind on the calling thread, then serve on a new one.
    ///
    /// Binding here means address-in-use errors surface to the caller.
    pub fn start(addr: SocketAddr, queue: RequestQueue, stats: Arc<ServerStats>) -> Result<Self> {
        let std_listener = std::net::TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let addr = std_listener.local_addr()?;

        let app = router(queue.clone(), stats);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("hostbridge-listener".into())
            .spawn(move || serve(std_listener, app, shutdown_rx))?;

        tracing::info!("Listening on http://{}", addr);
        Ok(Self {
            addr,
            queue,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop accepting, wait up to `timeout` for the thread, discard queued
    /// requests. Returns how many requests were discarded. Idempotent.
    pub fn stop(&mut self, timeout: Duration) -> usize {
        let Some(shutdown) = self.shutdown.take() else {
            return 0;
        };
        // thread may already have exited on a serve error
        let _ = shutdown.send(());

        // dropping the reply senders lets waiting handlers answer and close
        let mut discarded = self.queue.clear();

        if let Some(thread) = self.thread.take() {
            let deadline = Instant::now() + timeout;
            while !thread.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            if thread.is_finished() {
                if thread.join().is_err() {
                    tracing::error!("Listener thread panicked");
                }
            } else {
                tracing::warn!(
                    "Listener thread did not exit within {:?}; detaching",
                    timeout
                );
            }
        }

        discarded += self.queue.clear();
        if discarded > 0 {
            tracing::info!("Discarded {} unprocessed requests", discarded);
        }
        tracing::info!("Listener on {} stopped", self.addr);
        discarded
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop(Duration::from_millis(100));
    }
}

fn serve(std_listener: std::net::TcpListener, app: Router, shutdown: oneshot::Receiver<()>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create listener runtime: {}", e);
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::from_std(std_listener) {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to register listener socket: {}", e);
                return;
            }
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await
        {
            tracing::error!("Listener error: {}", e);
        }
    });
}

fn shutdown_signal(rx: oneshot::Receiver<()>) -> impl Future<Output = ()> {
    async move {
        // a dropped sender also means stop
        let _ = rx.await;
        tracing::debug!("Listener shutdown signalled");
    }
}
