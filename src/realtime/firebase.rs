//! Hosted realtime database over its REST and streaming API
//!
//! Point operations map to `GET`/`PUT`/`DELETE {base}/{path}.json`.
//! Subscriptions open a `text/event-stream` request on the same URL; the
//! server first sends a `put` with the whole value at `/`, then `put` and
//! `patch` events relative to the subscribed path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio_stream::StreamExt;

use super::{
    sse::{SseEvent, SseParser},
    tree, RealtimeStore, StoreError, Subscription,
};
use crate::config::StoreConfig;

#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

/// Payload of `put` and `patch` stream events
#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

impl FirebaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        // No client-wide timeout: it would also cut long-lived streams.
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, tree::segments(path).join("/"))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    async fn check_status(path: &str, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let request = self.with_auth(self.client.get(self.url(path))).timeout(self.timeout);
        let response = Self::check_status(path, request.send().await?).await?;
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        tracing::debug!("PUT {} = {}", path, value);
        let request = self
            .with_auth(self.client.put(self.url(path)))
            .query(&[("print", "silent")])
            .json(&value)
            .timeout(self.timeout);
        Self::check_status(path, request.send().await?).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        tracing::debug!("DELETE {}", path);
        let request = self
            .with_auth(self.client.delete(self.url(path)))
            .timeout(self.timeout);
        Self::check_status(path, request.send().await?).await?;
        Ok(())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let request = self
            .with_auth(self.client.get(self.url(path)))
            .header(ACCEPT, "text/event-stream");
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| StoreError::Timeout(path.to_string()))??;
        let response = Self::check_status(path, response).await?;

        let (tx, rx) = watch::channel(None);
        let (ready_tx, ready_rx) = oneshot::channel();
        let listener = tokio::spawn(listen(path.to_string(), response, tx, ready_tx));

        match tokio::time::timeout(self.timeout, ready_rx).await {
            Ok(Ok(())) => {
                tracing::debug!("Listening on {}", path);
                Ok(Subscription::new(path, rx, listener.abort_handle()))
            }
            Ok(Err(_)) => Err(StoreError::Closed(path.to_string())),
            Err(_) => {
                listener.abort();
                Err(StoreError::Timeout(path.to_string()))
            }
        }
    }
}

/// Drive one event stream until the server closes it or every receiver is gone
async fn listen(
    path: String,
    response: Response,
    tx: watch::Sender<Option<Value>>,
    ready: oneshot::Sender<()>,
) {
    let mut ready = Some(ready);
    let mut parser = SseParser::default();
    let mut state = Value::Null;
    let mut bytes = Box::pin(response.bytes_stream());

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => break,
            chunk = bytes.next() => chunk,
        };
        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                tracing::warn!("Stream on {} failed: {}", path, e);
                break;
            }
            None => {
                tracing::info!("Stream on {} ended", path);
                break;
            }
        };

        for event in parser.feed(&chunk) {
            match apply_event(&mut state, &event) {
                Ok(EventEffect::Changed) => {
                    let snapshot = if state.is_null() { None } else { Some(state.clone()) };
                    tx.send_if_modified(|current| {
                        if *current == snapshot {
                            false
                        } else {
                            *current = snapshot;
                            true
                        }
                    });
                    if let Some(ready) = ready.take() {
                        let _ = ready.send(());
                    }
                }
                Ok(EventEffect::Ignored) => {}
                Ok(EventEffect::Closed) => {
                    tracing::warn!("Server closed stream on {} ({})", path, event.event);
                    return;
                }
                Err(e) => tracing::warn!("Skipping malformed {} event on {}: {}", event.event, path, e),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum EventEffect {
    Changed,
    Ignored,
    Closed,
}

/// Fold one stream event into the locally mirrored value
fn apply_event(state: &mut Value, event: &SseEvent) -> Result<EventEffect, serde_json::Error> {
    match event.event.as_str() {
        "put" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            tree::put_at(state, &tree::segments(&payload.path), payload.data);
            Ok(EventEffect::Changed)
        }
        "patch" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)?;
            let base = tree::segments(&payload.path);
            if let Value::Object(children) = payload.data {
                for (key, value) in children {
                    let mut segs = base.clone();
                    segs.extend(tree::segments(&key));
                    tree::put_at(state, &segs, value);
                }
            }
            Ok(EventEffect::Changed)
        }
        "cancel" | "auth_revoked" => Ok(EventEffect::Closed),
        _ => Ok(EventEffect::Ignored),
    }
}
