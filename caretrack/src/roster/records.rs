//! Person record shape shared by the account, staff, and patient endpoints.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::position::resolve_fields;

/// One record from any of the person collections.
///
/// Only the identity and join fields are typed; everything else the backend
/// sends - coordinate fields under their various spellings, nested
/// `location`/`coords`/`user` objects, organization tags - lands in
/// [`extra`] and is probed dynamically. Records are read-only inputs: they
/// are refreshed from the directory, never mutated here.
///
/// [`extra`]: PersonRecord::extra
#[derive(Debug, Clone, Deserialize)]
pub struct PersonRecord {
    /// Record id within its own collection.
    pub id: i64,

    /// Owning account id, for staff and patient profiles that carry one.
    #[serde(default)]
    pub user_id: Option<i64>,

    /// Email, used as a join fallback for patient profiles.
    #[serde(default)]
    pub email: Option<String>,

    /// Full name, used as a last-resort join fallback.
    #[serde(default)]
    pub full_name: Option<String>,

    /// Free-text address for geocoding.
    #[serde(default)]
    pub address: Option<String>,

    /// Every other field the backend sent, kept for dynamic probing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersonRecord {
    /// Extract a validated coordinate pair from this record's fields.
    ///
    /// Probes the candidate shapes in priority order; see
    /// [`crate::position::resolve_fields`].
    pub fn position(&self) -> Option<(f64, f64)> {
        resolve_fields(&self.extra)
    }

    /// Email lower-cased for case-insensitive joining.
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    /// Full name lower-cased for case-insensitive joining.
    pub fn name_key(&self) -> Option<String> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_typed_fields_and_keeps_extras() {
        let record: PersonRecord = serde_json::from_value(json!({
            "id": 7,
            "user_id": 3,
            "email": "Pat@Example.com",
            "full_name": "Pat Example",
            "address": "100 Queen St",
            "latitude": 43.0,
            "longitude": -79.0,
            "organization": "north-team"
        }))
        .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.user_id, Some(3));
        assert_eq!(record.position(), Some((43.0, -79.0)));
        assert_eq!(record.extra.get("organization"), Some(&json!("north-team")));
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let record: PersonRecord = serde_json::from_value(json!({"id": 1})).unwrap();
        assert_eq!(record.user_id, None);
        assert_eq!(record.email, None);
        assert_eq!(record.position(), None);
    }

    #[test]
    fn join_keys_are_case_insensitive_and_trimmed() {
        let record: PersonRecord = serde_json::from_value(json!({
            "id": 1,
            "email": " Pat@Example.COM ",
            "full_name": "Pat Example"
        }))
        .unwrap();

        assert_eq!(record.email_key(), Some("pat@example.com".to_string()));
        assert_eq!(record.name_key(), Some("pat example".to_string()));
    }

    #[test]
    fn blank_join_fields_yield_no_key() {
        let record: PersonRecord =
            serde_json::from_value(json!({"id": 1, "email": "  ", "full_name": ""})).unwrap();
        assert_eq!(record.email_key(), None);
        assert_eq!(record.name_key(), None);
    }
}
