//! Roster of authorized tags: listing, live updates and deletion

use serde::Serialize;
use tokio_stream::{Stream, StreamExt};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        roster::build_roster,
        Notice, RosterEntry, RosterQuery, RosterSelection,
    },
    realtime::{validate_key, StoreError},
    repository::{authorized_uids::decode_collection, Repository},
};

/// Result of a bulk deletion
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkDeleteResult {
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Clone)]
pub struct RosterService {
    repository: Repository,
}

impl RosterService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Current roster, filtered and sorted
    pub async fn list(&self, query: &RosterQuery) -> AppResult<Vec<RosterEntry>> {
        let records = self
            .repository
            .authorized_uids
            .all()
            .await
            .map_err(|e| AppError::remote("Failed to load authorized UIDs.", e))?;
        Ok(build_roster(&records, query))
    }

    /// Roster rebuilt on every change of the collection
    pub async fn watch(
        &self,
        query: RosterQuery,
    ) -> AppResult<impl Stream<Item = Vec<RosterEntry>> + Send + 'static> {
        let subscription = self
            .repository
            .authorized_uids
            .subscribe()
            .await
            .map_err(|e| AppError::remote("Failed to load authorized UIDs.", e))?;
        Ok(subscription
            .into_stream()
            .map(move |value| build_roster(&decode_collection(value), &query)))
    }

    /// Remove one record
    pub async fn delete(&self, uid: &str) -> AppResult<Notice> {
        check_uid(uid)?;
        self.repository
            .authorized_uids
            .remove(uid)
            .await
            .map_err(|e| AppError::remote("Failed to remove UID.", e))?;
        tracing::info!("Removed authorized UID {}", uid);
        Ok(Notice::success(format!("UID {} removed", uid)))
    }

    /// Remove every selected record, one at a time
    ///
    /// UIDs no longer in the collection are dropped from the selection first
    /// and not counted. Stops at the first failure; records removed before it
    /// stay removed.
    pub async fn bulk_delete(&self, uids: &[String], confirmed: bool) -> AppResult<BulkDeleteResult> {
        if uids.is_empty() {
            return Ok(BulkDeleteResult {
                deleted: 0,
                notice: None,
            });
        }
        if !confirmed {
            return Err(AppError::BadRequest(format!(
                "Are you sure you want to delete {} selected UID(s)? Confirmation required.",
                uids.len()
            )));
        }
        for uid in uids {
            check_uid(uid)?;
        }

        let records = self
            .repository
            .authorized_uids
            .all()
            .await
            .map_err(|e| AppError::remote("Failed to load authorized UIDs.", e))?;
        let mut selection = RosterSelection::default();
        selection.select_all(uids.iter().map(String::as_str));
        selection.retain_present(records.keys().map(String::as_str));
        if selection.len() < uids.len() {
            tracing::debug!("{} selected UID(s) already gone", uids.len() - selection.len());
        }

        let total = selection.len();
        let mut deleted = 0;
        for uid in selection.selected() {
            if let Err(e) = self.repository.authorized_uids.remove(&uid).await {
                return Err(AppError::remote(
                    format!("Bulk delete failed. {} of {} UID(s) deleted.", deleted, total),
                    e,
                ));
            }
            deleted += 1;
        }
        tracing::info!("Bulk removed {} authorized UID(s)", deleted);
        Ok(BulkDeleteResult {
            deleted,
            notice: Some(Notice::success(format!("{} UID(s) deleted", deleted))),
        })
    }
}

fn check_uid(uid: &str) -> AppResult<()> {
    validate_key(uid).map_err(|e| match e {
        StoreError::InvalidKey(key) => AppError::Validation(format!("Invalid UID: {:?}", key)),
        other => AppError::Remote(other),
    })
}
