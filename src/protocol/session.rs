//! One client session: a sequential request loop over a duplex channel.
//!
//! A session reads one message, routes it, writes the response, and only
//! then reads the next. Many sessions run concurrently as independent tasks
//! sharing the same [`ProtocolRouter`].

use crate::protocol::router::ProtocolRouter;
use crate::types::SessionId;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Session lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handling,
    Closed,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    router: Arc<ProtocolRouter>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(id: SessionId, router: Arc<ProtocolRouter>) -> Self {
        Self {
            id,
            router,
            state: watch::Sender::new(SessionState::Idle),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Follow state transitions. The receiver keeps the final `Closed`
    /// value after [`Session::run`] returns.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Serve the session until the inbound side closes, the outbound side
    /// is dropped, or `cancel` fires. Cancellation abandons a request that
    /// is awaiting a response; an outbound call it already started runs to
    /// completion on its own task and its result is discarded.
    pub async fn run(
        self,
        mut inbound: mpsc::Receiver<Value>,
        outbound: mpsc::Sender<Value>,
        cancel: CancellationToken,
    ) -> SessionState {
        tracing::debug!(session = %self.id, "Session started");

        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => break,
                message = inbound.recv() => match message {
                    Some(m) => m,
                    None => break,
                },
            };

            self.state.send_replace(SessionState::Handling);
            let response = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(session = %self.id, "Session closed mid-request");
                    break;
                }
                response = self.router.handle(message) => response,
            };

            if let Some(response) = response {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = outbound.send(response) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            self.state.send_replace(SessionState::Idle);
        }

        self.state.send_replace(SessionState::Closed);
        tracing::debug!(session = %self.id, "Session closed");
        SessionState::Closed
    }
}
