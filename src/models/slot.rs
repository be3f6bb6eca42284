//! Parking slot occupancy

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Slot index (1-based) to the label painted on the bay
pub const SLOT_LABELS: [(u8, &str); 6] = [
    (1, "A1"),
    (2, "A2"),
    (3, "A3"),
    (4, "R1"),
    (5, "R2"),
    (6, "R3"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SlotState {
    pub index: u8,
    pub label: String,
    pub occupied: bool,
}

/// Decode the loosely typed value a sensor writes for one slot
pub fn is_occupied(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1" || s.eq_ignore_ascii_case("occupied")
        }
        _ => false,
    }
}

/// Map the `parkingSlots` value onto the six fixed slots
///
/// The database returns numeric keys either as an object or as an array
/// padded with `null` at index 0.
pub fn occupancy_from(value: Option<&Value>) -> Vec<SlotState> {
    SLOT_LABELS
        .iter()
        .map(|(index, label)| {
            let raw = match value {
                Some(Value::Object(map)) => map.get(&index.to_string()),
                Some(Value::Array(items)) => items.get(usize::from(*index)),
                _ => None,
            };
            SlotState {
                index: *index,
                label: label.to_string(),
                occupied: is_occupied(raw),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn occupied_labels(slots: &[SlotState]) -> Vec<&str> {
        slots.iter().filter(|s| s.occupied).map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_object_and_array_shapes() {
        let object = json!({"1": true, "4": 1, "6": "true"});
        assert_eq!(occupied_labels(&occupancy_from(Some(&object))), vec!["A1", "R1", "R3"]);

        let array = json!([null, false, true, false, false, true]);
        assert_eq!(occupied_labels(&occupancy_from(Some(&array))), vec!["A2", "R2"]);
    }

    #[test]
    fn test_missing_parent_is_all_free() {
        let slots = occupancy_from(None);
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| !s.occupied));
        assert_eq!(slots[3].label, "R1");
    }

    #[test]
    fn test_boolean_ish_values() {
        assert!(is_occupied(Some(&json!("Occupied"))));
        assert!(is_occupied(Some(&json!(2.5))));
        assert!(!is_occupied(Some(&json!(0))));
        assert!(!is_occupied(Some(&json!("false"))));
        assert!(!is_occupied(Some(&json!({"occupied": true}))));
        assert!(!is_occupied(None));
    }
}
