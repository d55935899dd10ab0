//! Local endpoints and fake collaborators for worker tests.

#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use serde_json::Value;

use crate::error::MonitorError;
use crate::notify::{NotifyError, Notifier};
use crate::store::{Collection, RecordStore};

#[derive(Debug, Default)]
struct Seen {
    hits: AtomicUsize,
    last: Mutex<Option<String>>,
}

/// HTTP endpoint answering every request with a fixed status.
#[derive(Debug, Clone)]
pub(crate) struct Responder {
    /// `127.0.0.1:<port>`, usable as a check url.
    pub host: String,
    seen: Arc<Seen>,
}

impl Responder {
    pub(crate) fn hits(&self) -> usize {
        self.seen.hits.load(Ordering::SeqCst)
    }

    /// `"<METHOD> <path?query>"` of the latest request.
    pub(crate) fn last_request(&self) -> Option<String> {
        self.seen.last.lock().ok().and_then(|last| last.clone())
    }
}

pub(crate) async fn spawn_responder(status: u16) -> Responder {
    let Ok(status) = StatusCode::from_u16(status) else {
        panic!("invalid status {status}");
    };
    let seen = Arc::new(Seen::default());
    let app = Router::new()
        .fallback(
            move |State(seen): State<Arc<Seen>>, method: Method, uri: Uri| async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut last) = seen.last.lock() {
                    *last = Some(format!("{method} {uri}"));
                }
                status
            },
        )
        .with_state(Arc::clone(&seen));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Responder {
        host: addr.to_string(),
        seen,
    }
}

/// Accepts connections and never writes a byte back.
pub(crate) async fn spawn_silent_listener() -> String {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr.to_string()
}

/// Notifier that records every alert and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub(crate) fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((phone.to_string(), message.to_string()));
        }
        if self.fail {
            return Err(NotifyError::SendFailed("gateway down".to_string()));
        }
        Ok(())
    }
}

/// Store wrapper whose updates always fail.
#[derive(Debug)]
pub(crate) struct ReadOnlyStore<S>(pub S);

#[async_trait]
impl<S: RecordStore> RecordStore for ReadOnlyStore<S> {
    async fn create(&self, c: Collection, id: &str, record: &Value) -> Result<(), MonitorError> {
        self.0.create(c, id, record).await
    }

    async fn read(&self, c: Collection, id: &str) -> Result<Value, MonitorError> {
        self.0.read(c, id).await
    }

    async fn update(&self, _c: Collection, _id: &str, _record: &Value) -> Result<(), MonitorError> {
        Err(MonitorError::PersistenceError("read-only store".to_string()))
    }

    async fn delete(&self, c: Collection, id: &str) -> Result<(), MonitorError> {
        self.0.delete(c, id).await
    }

    async fn list(&self, c: Collection) -> Result<Vec<String>, MonitorError> {
        self.0.list(c).await
    }
}
