//! Organization scope filtering.

use serde_json::Value;

use super::records::PersonRecord;

/// Organization-identifying fields probed on the record itself.
const ORG_FIELDS: &[&str] = &[
    "organization",
    "organisation",
    "org",
    "orgName",
    "organisation_name",
    "organization_name",
    "org_id",
    "organization_id",
    "organisation_id",
];

/// Organization-identifying fields probed on a nested account reference.
const ORG_USER_FIELDS: &[&str] = &[
    "organization",
    "organisation",
    "org",
    "org_id",
    "organization_id",
];

/// Check whether a record belongs to the given organization scope.
///
/// Candidate fields are compared case-insensitively after trimming. The
/// filter fails open: a record exposing no candidate field at all passes
/// unconditionally, and an empty filter value disables filtering entirely.
pub fn matches_org(record: &PersonRecord, filter: &str) -> bool {
    let wanted = filter.trim().to_lowercase();
    if wanted.is_empty() {
        return true;
    }

    let mut saw_candidate = false;

    let direct = ORG_FIELDS.iter().filter_map(|f| record.extra.get(*f));
    let nested = record
        .extra
        .get("user")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|user| ORG_USER_FIELDS.iter().filter_map(|f| user.get(*f)));

    for value in direct.chain(nested) {
        let Some(candidate) = candidate_key(value) else {
            continue;
        };
        saw_candidate = true;
        if candidate == wanted {
            return true;
        }
    }

    !saw_candidate
}

/// Normalize a candidate field value for comparison.
///
/// Strings are trimmed and lower-cased; numeric ids compare by their decimal
/// rendering. Null, empty, and structured values cannot be evaluated and do
/// not count as present.
fn candidate_key(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_lowercase())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> PersonRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_filter_disables_filtering() {
        let r = record(json!({"id": 1, "organization": "east"}));
        assert!(matches_org(&r, ""));
        assert!(matches_org(&r, "   "));
    }

    #[test]
    fn matches_case_insensitively() {
        let r = record(json!({"id": 1, "organization": "  North-Team "}));
        assert!(matches_org(&r, "north-team"));
        assert!(matches_org(&r, "NORTH-TEAM"));
    }

    #[test]
    fn mismatching_record_is_excluded() {
        let r = record(json!({"id": 1, "organization": "east"}));
        assert!(!matches_org(&r, "west"));
    }

    #[test]
    fn record_without_org_fields_passes() {
        // Fail-open: nothing to evaluate means the record is kept.
        let r = record(json!({"id": 1, "email": "a@b.c"}));
        assert!(matches_org(&r, "west"));
    }

    #[test]
    fn numeric_org_id_matches_its_decimal_rendering() {
        let r = record(json!({"id": 1, "org_id": 42}));
        assert!(matches_org(&r, "42"));
        assert!(!matches_org(&r, "43"));
    }

    #[test]
    fn nested_account_reference_is_probed() {
        let r = record(json!({"id": 1, "user": {"organization": "East"}}));
        assert!(matches_org(&r, "east"));
        assert!(!matches_org(&r, "west"));
    }

    #[test]
    fn blank_org_field_counts_as_absent() {
        let r = record(json!({"id": 1, "organization": "  "}));
        assert!(matches_org(&r, "west"));
    }

    #[test]
    fn alternate_spellings_are_recognized() {
        for field in ["organisation", "orgName", "organization_name", "organisation_id"] {
            let r = record(json!({"id": 1, field: "east"}));
            assert!(matches_org(&r, "east"), "field {field}");
        }
    }
}
