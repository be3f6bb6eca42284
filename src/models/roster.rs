//! Roster of authorized tags: rows, filtering, sorting and selection

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::authorized_uid::AuthorizedUid;

/// One row of the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RosterEntry {
    pub uid: String,
    pub name: String,
    pub plate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl RosterEntry {
    pub fn from_record(uid: &str, record: &AuthorizedUid) -> Self {
        let name = if record.name.is_empty() { "Unnamed" } else { record.name.as_str() };
        let plate = if record.plate.is_empty() { "No Plate" } else { record.plate.as_str() };
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            plate: plate.to_string(),
            timestamp: record.timestamp,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.uid.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.plate.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    #[default]
    Uid,
    Plate,
    Newest,
    Oldest,
}

/// Roster filter and sort parameters
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RosterQuery {
    /// Case-insensitive substring matched against uid, name and plate
    pub search: Option<String>,
    pub sort: Option<SortKey>,
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Records without a timestamp go last in both directions
fn compare_time(a: Option<i64>, b: Option<i64>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if newest_first => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter and sort the authorized records into roster rows
pub fn build_roster(records: &BTreeMap<String, AuthorizedUid>, query: &RosterQuery) -> Vec<RosterEntry> {
    let needle = query.search.as_deref().unwrap_or("").trim().to_lowercase();
    let sort = query.sort.unwrap_or_default();

    let mut entries: Vec<RosterEntry> = records
        .iter()
        .map(|(uid, record)| RosterEntry::from_record(uid, record))
        .filter(|entry| entry.matches(&needle))
        .collect();

    entries.sort_by(|a, b| {
        let primary = match sort {
            SortKey::Name => compare_text(&a.name, &b.name),
            SortKey::Uid => compare_text(&a.uid, &b.uid),
            SortKey::Plate => compare_text(&a.plate, &b.plate),
            SortKey::Newest => compare_time(a.timestamp, b.timestamp, true),
            SortKey::Oldest => compare_time(a.timestamp, b.timestamp, false),
        };
        primary.then_with(|| a.uid.cmp(&b.uid))
    });
    entries
}

/// Rows picked for a bulk action
///
/// Rows that vanished from the roster since they were picked are dropped
/// with `retain_present` before the action runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterSelection {
    selected: BTreeSet<String>,
}

impl RosterSelection {
    pub fn select_all<'a>(&mut self, uids: impl IntoIterator<Item = &'a str>) {
        self.selected.extend(uids.into_iter().map(str::to_string));
    }

    pub fn is_selected(&self, uid: &str) -> bool {
        self.selected.contains(uid)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Forget rows that disappeared from the roster
    pub fn retain_present<'a>(&mut self, uids: impl IntoIterator<Item = &'a str>) {
        let present: BTreeSet<&str> = uids.into_iter().collect();
        self.selected.retain(|uid| present.contains(uid.as_str()));
    }
}
