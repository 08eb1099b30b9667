//! Session protocol server: opens sessions, tracks them, routes deliveries.
//!
//! Transport-agnostic. A transport calls [`SessionProtocolServer::open_session`]
//! when a client connects, forwards client messages through
//! [`SessionProtocolServer::deliver`], and drains responses from the returned
//! [`SessionHandle`]. Dropping the handle closes the session.

use crate::protocol::router::ProtocolRouter;
use crate::protocol::session::Session;
use crate::types::{Error, Result, SessionConfig, SessionId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio_util::sync::{CancellationToken, DropGuard};

type Registry = Arc<RwLock<HashMap<SessionId, mpsc::Sender<Value>>>>;

/// Result of handing one client message to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    UnknownSession,
    /// The session exists but has stopped reading.
    Closed,
}

/// Server-side end of an open session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    outbound: mpsc::Receiver<Value>,
    _close_on_drop: DropGuard,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Next server-to-client message; `None` once the session has ended.
    pub async fn recv(&mut self) -> Option<Value> {
        self.outbound.recv().await
    }
}

/// Holds the shared router and the registry of live sessions.
#[derive(Debug)]
pub struct SessionProtocolServer {
    router: Arc<ProtocolRouter>,
    config: SessionConfig,
    max_sessions: usize,
    permits: Arc<Semaphore>,
    sessions: Registry,
    cancel: CancellationToken,
}

impl SessionProtocolServer {
    pub fn new(router: ProtocolRouter, config: SessionConfig, max_sessions: usize) -> Self {
        Self {
            router: Arc::new(router),
            config,
            max_sessions,
            permits: Arc::new(Semaphore::new(max_sessions)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn router(&self) -> &Arc<ProtocolRouter> {
        &self.router
    }

    /// Open a session and spawn its task. Fails with `SessionLimit` when
    /// `max_sessions` are already open.
    pub async fn open_session(&self) -> Result<SessionHandle> {
        let permit = self.permits.clone().try_acquire_owned().map_err(|_| {
            tracing::warn!(max_sessions = self.max_sessions, "Session rejected: at capacity");
            Error::SessionLimit(self.max_sessions)
        })?;

        let id = SessionId::new();
        let capacity = self.config.channel_capacity.max(1);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let cancel = self.cancel.child_token();

        self.sessions.write().await.insert(id.clone(), in_tx);
        tracing::info!(
            session = %id,
            active = self.max_sessions - self.permits.available_permits(),
            "Session opened"
        );

        let session = Session::new(id.clone(), Arc::clone(&self.router));
        let sessions = Arc::clone(&self.sessions);
        let task_cancel = cancel.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            session.run(in_rx, out_tx, task_cancel).await;
            sessions.write().await.remove(&task_id);
            tracing::info!(session = %task_id, "Session ended");
            // permit is dropped here, releasing the session slot
            drop(permit);
        });

        Ok(SessionHandle {
            id,
            outbound: out_rx,
            _close_on_drop: cancel.drop_guard(),
        })
    }

    /// Hand a client message to a session. Waits while the session's
    /// inbound queue is full.
    pub async fn deliver(&self, id: &SessionId, message: Value) -> Delivery {
        let sender = match self.sessions.read().await.get(id) {
            Some(sender) => sender.clone(),
            None => return Delivery::UnknownSession,
        };
        match sender.send(message).await {
            Ok(()) => Delivery::Accepted,
            Err(_) => Delivery::Closed,
        }
    }

    /// Number of sessions currently registered.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{EchoInvoker, InvocationDispatcher};
    use crate::protocol::content::StaticContent;
    use crate::tools::{CatalogHandle, ToolCatalog};
    use serde_json::json;
    use std::time::Duration;

    fn server(max_sessions: usize) -> SessionProtocolServer {
        let dispatcher = InvocationDispatcher::new(
            Arc::new(CatalogHandle::new(ToolCatalog::build(Vec::new()).unwrap())),
            Arc::new(EchoInvoker::new()),
        );
        let router = ProtocolRouter::new(dispatcher, Arc::new(StaticContent::default()), "test");
        SessionProtocolServer::new(router, SessionConfig::default(), max_sessions)
    }

    async fn wait_for_count(server: &SessionProtocolServer, expected: usize) {
        for _ in 0..100 {
            if server.session_count().await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session count never reached {expected}");
    }

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let server = server(4);
        let mut handle = server.open_session().await.unwrap();

        let delivery = server
            .deliver(handle.id(), json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .await;
        assert_eq!(delivery, Delivery::Accepted);
        let resp = handle.recv().await.unwrap();
        assert_eq!(resp["id"], 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let server = server(4);
        let delivery = server.deliver(&SessionId::new(), json!({})).await;
        assert_eq!(delivery, Delivery::UnknownSession);
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_and_frees_slot() {
        let server = server(1);
        let handle = server.open_session().await.unwrap();
        let id = handle.id().clone();
        assert!(matches!(
            server.open_session().await,
            Err(Error::SessionLimit(1))
        ));

        drop(handle);
        wait_for_count(&server, 0).await;
        assert_eq!(server.deliver(&id, json!({})).await, Delivery::UnknownSession);
        assert!(server.open_session().await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_ends_all_sessions() {
        let server = server(4);
        let mut a = server.open_session().await.unwrap();
        let mut b = server.open_session().await.unwrap();
        server.shutdown();
        assert!(a.recv().await.is_none());
        assert!(b.recv().await.is_none());
    }
}
