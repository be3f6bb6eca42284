//! Realtime key/value store access
//!
//! The panel never owns its data: every value lives in a hosted realtime
//! database addressed by slash-separated paths. [`RealtimeStore`] is the
//! seam between the services and that database; [`FirebaseStore`] talks to
//! the hosted REST/streaming API and [`MemoryStore`] keeps the tree in
//! process.

pub mod firebase;
pub mod memory;
pub mod sse;
pub mod tree;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::watch, task::AbortHandle};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

/// Longest key the hosted database accepts, in bytes
const MAX_KEY_BYTES: usize = 768;

static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^.#$\[\]/\x00-\x1F\x7F]+$").expect("static key pattern"));

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("listener on {0} closed")]
    Closed(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Check that a single path segment can be used as a database key
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.len() > MAX_KEY_BYTES || !KEY_PATTERN.is_match(key) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Path-addressed remote store with change subscriptions
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Point read; `None` when nothing is stored at `path`.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value at `path`. Writing `null` deletes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Listen to `path`. Resolves once the current value is known.
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;
}

/// Aborts the listener task backing a subscription
#[derive(Debug)]
struct ListenerGuard(AbortHandle);

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Cancellable handle on a remote listener
///
/// Yields the value at subscription time first, then every change. Dropping
/// the handle (or calling [`Subscription::cancel`]) stops the listener.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    rx: watch::Receiver<Option<Value>>,
    primed: bool,
    guard: ListenerGuard,
}

impl Subscription {
    pub(crate) fn new(path: &str, rx: watch::Receiver<Option<Value>>, listener: AbortHandle) -> Self {
        Self {
            path: path.to_string(),
            rx,
            primed: false,
            guard: ListenerGuard(listener),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the next value. `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn cancel(self) {
        tracing::debug!("Cancelling listener on {}", self.path);
    }

    /// Turn the handle into a stream; the listener lives as long as the stream.
    pub fn into_stream(self) -> impl Stream<Item = Option<Value>> + Send + 'static {
        let guard = self.guard;
        WatchStream::new(self.rx).map(move |value| {
            let _listener = &guard;
            value
        })
    }
}
