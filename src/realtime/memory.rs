//! In-process realtime store

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use super::{tree, RealtimeStore, StoreError, Subscription};

/// JSON tree held in memory with change notification
///
/// Subscribers see the same semantics as the hosted database: the current
/// value first, then one notification per distinct change.
#[derive(Clone)]
pub struct MemoryStore {
    root: Arc<watch::Sender<Value>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Null)
    }

    /// Start from an existing tree
    pub fn with_data(data: Value) -> Self {
        let (root, _) = watch::channel(Value::Null);
        let mut initial = Value::Null;
        tree::put_at(&mut initial, &[], data);
        root.send_replace(initial);
        Self {
            root: Arc::new(root),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Make every operation on `path` (or below it) fail, simulating an outage
    pub fn inject_failure(&self, path: &str) {
        let path = tree::segments(path).join("/");
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(path);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Whole tree, for inspection
    pub fn snapshot(&self) -> Value {
        self.root.borrow().clone()
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        let path = tree::segments(path).join("/");
        let failing = match self.failing.lock() {
            Ok(failing) => failing,
            Err(poisoned) => poisoned.into_inner(),
        };
        let blocked = failing
            .iter()
            .any(|f| path == *f || path.starts_with(&format!("{}/", f)) || f.is_empty());
        if blocked {
            return Err(StoreError::Status {
                path,
                status: 503,
                body: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn write(&self, path: &str, value: Value) {
        let segs = tree::segments(path);
        self.root.send_if_modified(|root| {
            let before = root.clone();
            tree::put_at(root, &segs, value);
            *root != before
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.check(path)?;
        let segs = tree::segments(path);
        let root = self.root.borrow();
        Ok(tree::get_at(&root, &segs).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.check(path)?;
        tracing::debug!("memory set {} = {}", path, value);
        self.write(path, value);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.check(path)?;
        tracing::debug!("memory remove {}", path);
        self.write(path, Value::Null);
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        self.check(path)?;
        let segs: Vec<String> = tree::segments(path).into_iter().map(str::to_string).collect();

        let mut root_rx = self.root.subscribe();
        let initial = {
            let refs: Vec<&str> = segs.iter().map(String::as_str).collect();
            tree::get_at(&root_rx.borrow_and_update(), &refs).cloned()
        };
        let (tx, rx) = watch::channel(initial);

        let listener = tokio::spawn(async move {
            let refs: Vec<&str> = segs.iter().map(String::as_str).collect();
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    changed = root_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let value = tree::get_at(&root_rx.borrow_and_update(), &refs).cloned();
                        tx.send_if_modified(|current| {
                            if *current == value {
                                false
                            } else {
                                *current = value;
                                true
                            }
                        });
                    }
                }
            }
        });

        Ok(Subscription::new(path, rx, listener.abort_handle()))
    }
}
