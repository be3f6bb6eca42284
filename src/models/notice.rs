//! Operator-facing messages

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
    Default,
}

/// A dismissable message for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub button_label: String,
    /// Close automatically after this many milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_close_ms: Option<u64>,
}

impl Notice {
    pub fn new(message: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            message: message.into(),
            level,
            button_label: "Cancel".to_string(),
            auto_close_ms: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Error)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, NoticeLevel::Info)
    }

    pub fn auto_close(mut self, button_label: &str, delay_ms: u64) -> Self {
        self.button_label = button_label.to_string();
        self.auto_close_ms = Some(delay_ms);
        self
    }
}
