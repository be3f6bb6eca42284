//! Data models for Autostelle

pub mod authorized_uid;
pub mod notice;
pub mod roster;
pub mod scan;
pub mod session;
pub mod slot;

// Re-export commonly used types
pub use authorized_uid::{AuthorizedUid, ReservationRequest};
pub use notice::{Notice, NoticeLevel};
pub use roster::{RosterEntry, RosterQuery, RosterSelection, SortKey};
pub use scan::{ScanPhase, ScanStatus};
pub use session::{PageKind, SessionClaims};
pub use slot::{SlotState, SLOT_LABELS};
