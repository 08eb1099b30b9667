//! HTTP + Server-Sent Events transport.
//!
//! `GET {sse_path}` opens a session. The first event is `endpoint`, whose
//! data is the URL the client must POST its messages to. Every response the
//! session produces follows as a `message` event. Closing the stream closes
//! the session.
//!
//! `POST {messages_path}?session_id=<id>` carries one JSON-RPC message and
//! answers `202 Accepted`; the reply arrives on the stream.

use crate::protocol::{Delivery, SessionHandle, SessionProtocolServer};
use crate::types::{Error, ServerConfig, SessionId};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct SseState {
    server: Arc<SessionProtocolServer>,
    messages_path: String,
    keep_alive: std::time::Duration,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

/// SSE front end for a [`SessionProtocolServer`].
#[derive(Debug)]
pub struct SseServer {
    server: Arc<SessionProtocolServer>,
    config: ServerConfig,
    cancel: CancellationToken,
}

impl SseServer {
    pub fn new(server: Arc<SessionProtocolServer>, config: ServerConfig) -> Self {
        Self {
            server,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Routes for the two endpoints.
    pub fn router(&self) -> Router {
        let state = SseState {
            server: Arc::clone(&self.server),
            messages_path: self.config.messages_path.clone(),
            keep_alive: self.config.keep_alive,
        };
        Router::new()
            .route(&self.config.sse_path, get(open_stream))
            .route(&self.config.messages_path, post(post_message))
            .with_state(state)
    }

    /// Bind `listen_addr` and serve until [`shutdown`](Self::shutdown).
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        self.serve_with_listener(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_with_listener(&self, listener: TcpListener) -> std::io::Result<()> {
        tracing::info!(
            addr = %listener.local_addr()?,
            sse_path = %self.config.sse_path,
            messages_path = %self.config.messages_path,
            max_sessions = self.config.max_sessions,
            "SSE server listening"
        );

        let cancel = self.cancel.clone();
        let server = Arc::clone(&self.server);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("SSE server shutting down");
                // open streams end once their sessions close
                server.shutdown();
            })
            .await
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn open_stream(State(state): State<SseState>) -> Response {
    let handle = match state.server.open_session().await {
        Ok(handle) => handle,
        Err(Error::SessionLimit(limit)) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("session limit reached ({})", limit),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to open session");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let endpoint = format!("{}?session_id={}", state.messages_path, handle.id());
    Sse::new(session_events(endpoint, handle))
        .keep_alive(KeepAlive::new().interval(state.keep_alive))
        .into_response()
}

/// `endpoint` first, then one `message` per session response. The stream
/// owns the handle, so dropping it closes the session.
fn session_events(
    endpoint: String,
    handle: SessionHandle,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let first = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let messages = stream::unfold(handle, |mut handle| async move {
        let message = handle.recv().await?;
        let event = Event::default().event("message").data(message.to_string());
        Some((Ok::<_, Infallible>(event), handle))
    });
    first.chain(messages)
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Ok(session_id) = SessionId::from_string(query.session_id) else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };

    let message: serde_json::Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(session = %session_id, error = %e, "Malformed message body");
            return (StatusCode::BAD_REQUEST, format!("Could not parse message: {}", e))
                .into_response();
        }
    };

    match state.server.deliver(&session_id, message).await {
        Delivery::Accepted => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Delivery::UnknownSession | Delivery::Closed => {
            (StatusCode::NOT_FOUND, "Could not find session").into_response()
        }
    }
}
