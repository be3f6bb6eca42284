//! Scan-authorization session state

use serde::Serialize;
use utoipa::ToSchema;

use super::notice::Notice;

/// Where the scan-authorization workflow currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    FormOpen,
    Validating,
    AwaitingScan,
    Processing,
    Success,
    DuplicateError,
    WriteError,
}

impl ScanPhase {
    /// An outcome is on display and cleanup is pending
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanPhase::Success | ScanPhase::DuplicateError | ScanPhase::WriteError)
    }

    /// Scan mode may be on; a new session cannot start
    pub fn is_active(self) -> bool {
        matches!(self, ScanPhase::Validating | ScanPhase::AwaitingScan | ScanPhase::Processing) || self.is_terminal()
    }
}

/// Snapshot of the session published to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScanStatus {
    pub phase: ScanPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    /// Tag identifier being (or last) processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_classification() {
        assert!(!ScanPhase::Idle.is_active());
        assert!(!ScanPhase::FormOpen.is_active());
        assert!(ScanPhase::AwaitingScan.is_active());
        assert!(ScanPhase::WriteError.is_active());
        assert!(ScanPhase::DuplicateError.is_terminal());
        assert!(!ScanPhase::Processing.is_terminal());
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(serde_json::to_value(ScanPhase::AwaitingScan).unwrap(), "awaiting_scan");
        assert_eq!(serde_json::to_value(ScanPhase::FormOpen).unwrap(), "form_open");
    }
}
