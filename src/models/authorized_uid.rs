//! Authorized tag records and reservation requests

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

/// Record stored under `authorizedUIDs/{uid}`
///
/// The physical gate grants access when `allowed` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorizedUid {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plate: String,
    /// Creation time in Unix milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl AuthorizedUid {
    pub fn new(name: &str, plate: &str, timestamp: i64) -> Self {
        Self {
            allowed: true,
            name: name.to_string(),
            plate: plate.to_string(),
            timestamp: Some(timestamp),
        }
    }

    /// Best-effort view of whatever is stored under a uid key
    ///
    /// Fields of the wrong type are read as text where possible and dropped
    /// otherwise; a value that is not an object yields an empty record that
    /// does not open the gate.
    pub fn from_stored(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return Self::default();
        };
        let text = |key: &str| match fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Self {
            allowed: matches!(fields.get("allowed"), Some(Value::Bool(true))),
            name: text("name"),
            plate: text("plate"),
            timestamp: fields.get("timestamp").and_then(Value::as_i64),
        }
    }
}

/// Name and plate entered in the reservation form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReservationRequest {
    #[validate(length(min = 1, message = "Please fill all fields."))]
    pub name: String,
    #[validate(length(min = 1, message = "Please fill all fields."))]
    pub plate: String,
}

impl ReservationRequest {
    /// Copy with surrounding whitespace removed from both fields
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            plate: self.plate.trim().to_string(),
        }
    }
}
