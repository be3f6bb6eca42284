//! Access to the `authorizedUIDs` collection

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::paths::AUTHORIZED_UIDS;
use crate::{
    models::AuthorizedUid,
    realtime::{validate_key, RealtimeStore, StoreError, Subscription},
};

#[derive(Clone)]
pub struct AuthorizedUidsRepository {
    store: Arc<dyn RealtimeStore>,
}

impl AuthorizedUidsRepository {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    fn path(uid: &str) -> Result<String, StoreError> {
        validate_key(uid)?;
        Ok(format!("{}/{}", AUTHORIZED_UIDS, uid))
    }

    /// Read the whole collection once
    pub async fn all(&self) -> Result<BTreeMap<String, AuthorizedUid>, StoreError> {
        let value = self.store.get(AUTHORIZED_UIDS).await?;
        Ok(decode_collection(value))
    }

    pub async fn get(&self, uid: &str) -> Result<Option<AuthorizedUid>, StoreError> {
        let value = self.store.get(&Self::path(uid)?).await?;
        Ok(value.map(|value| {
            serde_json::from_value(value.clone()).unwrap_or_else(|_| AuthorizedUid::from_stored(&value))
        }))
    }

    /// Write (replace) the record stored under `uid`
    pub async fn put(&self, uid: &str, record: &AuthorizedUid) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        self.store.set(&Self::path(uid)?, value).await
    }

    pub async fn remove(&self, uid: &str) -> Result<(), StoreError> {
        self.store.remove(&Self::path(uid)?).await
    }

    /// Listen to the whole collection
    pub async fn subscribe(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(AUTHORIZED_UIDS).await
    }
}

/// Decode a raw collection value
///
/// Every key is kept: a stored value that is not a well-formed record still
/// occupies its uid, so it is read leniently instead of being dropped.
pub fn decode_collection(value: Option<Value>) -> BTreeMap<String, AuthorizedUid> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.into_iter()
        .map(|(uid, raw)| {
            let record = match serde_json::from_value::<AuthorizedUid>(raw.clone()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Malformed record under {}: {}", uid, e);
                    AuthorizedUid::from_stored(&raw)
                }
            };
            (uid, record)
        })
        .collect()
}
