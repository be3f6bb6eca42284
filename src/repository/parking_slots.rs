//! Read access to the `parkingSlots` sensor values

use std::sync::Arc;

use super::paths::PARKING_SLOTS;
use crate::{
    models::{slot::occupancy_from, SlotState},
    realtime::{RealtimeStore, StoreError, Subscription},
};

#[derive(Clone)]
pub struct ParkingSlotsRepository {
    store: Arc<dyn RealtimeStore>,
}

impl ParkingSlotsRepository {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    pub async fn occupancy(&self) -> Result<Vec<SlotState>, StoreError> {
        let value = self.store.get(PARKING_SLOTS).await?;
        Ok(occupancy_from(value.as_ref()))
    }

    pub async fn subscribe(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(PARKING_SLOTS).await
    }
}
