//! Live occupancy of the six parking slots

use tokio_stream::{Stream, StreamExt};

use crate::{
    error::{AppError, AppResult},
    models::{slot::occupancy_from, SlotState},
    repository::Repository,
};

#[derive(Clone)]
pub struct OccupancyService {
    repository: Repository,
}

impl OccupancyService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn current(&self) -> AppResult<Vec<SlotState>> {
        self.repository
            .parking_slots
            .occupancy()
            .await
            .map_err(|e| AppError::remote("Failed to read parking slots.", e))
    }

    /// Slot states re-published on every sensor change
    pub async fn watch(&self) -> AppResult<impl Stream<Item = Vec<SlotState>> + Send + 'static> {
        let subscription = self
            .repository
            .parking_slots
            .subscribe()
            .await
            .map_err(|e| AppError::remote("Failed to read parking slots.", e))?;
        Ok(subscription
            .into_stream()
            .map(|value| occupancy_from(value.as_ref())))
    }
}
