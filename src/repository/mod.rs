//! Repository layer over the realtime store

pub mod authorized_uids;
pub mod parking_slots;
pub mod scan_channel;

use std::sync::Arc;

use crate::realtime::{RealtimeStore, StoreError};

/// Paths of the shared remote values
pub mod paths {
    pub const SCAN_MODE: &str = "scanMode";
    pub const LAST_SCANNED_UID: &str = "lastScannedUID";
    pub const AUTHORIZED_UIDS: &str = "authorizedUIDs";
    pub const PARKING_SLOTS: &str = "parkingSlots";
}

/// Main repository struct holding the store handle
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn RealtimeStore>,
    pub authorized_uids: authorized_uids::AuthorizedUidsRepository,
    pub scan_channel: scan_channel::ScanChannelRepository,
    pub parking_slots: parking_slots::ParkingSlotsRepository,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            authorized_uids: authorized_uids::AuthorizedUidsRepository::new(store.clone()),
            scan_channel: scan_channel::ScanChannelRepository::new(store.clone()),
            parking_slots: parking_slots::ParkingSlotsRepository::new(store.clone()),
            store,
        }
    }

    /// Cheap round trip used by the readiness probe
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.get(paths::SCAN_MODE).await.map(|_| ())
    }
}
