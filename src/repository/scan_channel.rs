//! The `scanMode` / `lastScannedUID` mailbox shared with the gate reader

use std::sync::Arc;

use serde_json::Value;

use super::paths::{LAST_SCANNED_UID, SCAN_MODE};
use crate::realtime::{RealtimeStore, StoreError, Subscription};

#[derive(Clone)]
pub struct ScanChannelRepository {
    store: Arc<dyn RealtimeStore>,
}

impl ScanChannelRepository {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    pub async fn set_scan_mode(&self, enabled: bool) -> Result<(), StoreError> {
        self.store.set(SCAN_MODE, Value::Bool(enabled)).await
    }

    pub async fn scan_mode(&self) -> Result<bool, StoreError> {
        Ok(matches!(self.store.get(SCAN_MODE).await?, Some(Value::Bool(true))))
    }

    pub async fn clear_last_scanned(&self) -> Result<(), StoreError> {
        self.store.set(LAST_SCANNED_UID, Value::String(String::new())).await
    }

    pub async fn last_scanned(&self) -> Result<Option<String>, StoreError> {
        Ok(scanned_uid(self.store.get(LAST_SCANNED_UID).await?.as_ref()))
    }

    pub async fn subscribe_last_scanned(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(LAST_SCANNED_UID).await
    }
}

/// Non-empty tag identifier carried by a `lastScannedUID` value
///
/// The value is used exactly as written, since the gate looks records up
/// by the raw identifier. Numeric identifiers are used as their decimal text.
pub fn scanned_uid(value: Option<&Value>) -> Option<String> {
    let uid = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if uid.is_empty() {
        None
    } else {
        Some(uid)
    }
}
