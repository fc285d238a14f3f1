//! Account-to-position join across the person collections.

use std::collections::HashMap;

use serde::Serialize;

use crate::geocode::{GeocodeCache, GeocodeClient, GeocodeOutcome};
use crate::position::{PositionSource, ResolvedPosition};

use super::filter::matches_org;
use super::records::PersonRecord;

/// One resolved row per account, for tabular or map display.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Provenance of the coordinates, absent while the row is unresolved.
    pub source: Option<PositionSource>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Address retained for the next recomputation when unresolved.
    pub address: String,
}

/// Resolve one row per account from the three person collections.
///
/// Resolution order per account, first success wins:
///
/// 1. staff profile linked by owning-account id, when the resolver succeeds
///    on it (source `staff`);
/// 2. patient profile linked by owning-account id, falling back to
///    case-insensitive email equality, then case-insensitive full-name
///    equality (source `patient`);
/// 3. the address from the patient profile, the staff profile, or the
///    account itself, in that priority, consulted against the geocode cache
///    (source `geocoded-cache` on a hit). A pending or missed lookup leaves
///    the row unresolved with its address retained.
///
/// Unresolvable rows are still emitted with null coordinates. The whole
/// computation is idempotent: re-running it with a cache that settled in the
/// meantime upgrades pending rows and changes nothing else.
///
/// `org_filter`, when non-empty, keeps only records matching the
/// organization scope (fail-open for records carrying no organization
/// field). Geocode misses spawn lookups on the current Tokio runtime.
pub fn resolve_rows<C: GeocodeClient + 'static>(
    accounts: &[PersonRecord],
    staff: &[PersonRecord],
    patients: &[PersonRecord],
    geocode: &GeocodeCache<C>,
    org_filter: Option<&str>,
) -> Vec<ResolvedRow> {
    let filter = org_filter.map(str::trim).filter(|f| !f.is_empty());
    let in_scope = |record: &PersonRecord| filter.is_none_or(|f| matches_org(record, f));

    let staff_by_account: HashMap<i64, &PersonRecord> = staff
        .iter()
        .filter(|s| in_scope(s))
        .filter_map(|s| s.user_id.map(|uid| (uid, s)))
        .collect();

    let mut patient_by_account: HashMap<i64, &PersonRecord> = HashMap::new();
    let mut patient_by_email: HashMap<String, &PersonRecord> = HashMap::new();
    let mut patient_by_name: HashMap<String, &PersonRecord> = HashMap::new();
    for patient in patients.iter().filter(|p| in_scope(p)) {
        if let Some(uid) = patient.user_id {
            patient_by_account.insert(uid, patient);
        }
        if let Some(email) = patient.email_key() {
            patient_by_email.insert(email, patient);
        }
        if let Some(name) = patient.name_key() {
            patient_by_name.insert(name, patient);
        }
    }

    let mut rows = Vec::new();
    for account in accounts.iter().filter(|a| in_scope(a)) {
        let staff_profile = staff_by_account.get(&account.id).copied();
        let patient_profile = patient_by_account
            .get(&account.id)
            .copied()
            .or_else(|| {
                account
                    .email_key()
                    .and_then(|e| patient_by_email.get(&e).copied())
            })
            .or_else(|| {
                account
                    .name_key()
                    .and_then(|n| patient_by_name.get(&n).copied())
            });

        let mut resolved: Option<ResolvedPosition> = None;

        if let Some(profile) = staff_profile {
            resolved = profile
                .position()
                .and_then(|(lat, lon)| ResolvedPosition::new(lat, lon, PositionSource::Staff));
        }

        if resolved.is_none() {
            if let Some(profile) = patient_profile {
                resolved = profile
                    .position()
                    .and_then(|(lat, lon)| ResolvedPosition::new(lat, lon, PositionSource::Patient));
            }
        }

        let mut address = String::new();
        if resolved.is_none() {
            address = patient_profile
                .and_then(|p| p.address.clone())
                .or_else(|| staff_profile.and_then(|s| s.address.clone()))
                .or_else(|| account.address.clone())
                .unwrap_or_default();

            if let GeocodeOutcome::Hit(position) = geocode.resolve_address(&address) {
                resolved = Some(position);
            }
        }

        rows.push(ResolvedRow {
            id: account.id,
            name: account.full_name.clone().unwrap_or_default(),
            email: account.email.clone().unwrap_or_default(),
            source: resolved.map(|p| p.source),
            latitude: resolved.map(|p| p.latitude),
            longitude: resolved.map(|p| p.longitude),
            address,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::{GeocodeCandidate, GeocodeError};
    use serde_json::json;

    /// Client for rows that never reach the geocode fallback.
    struct UnreachableClient;

    impl GeocodeClient for UnreachableClient {
        async fn geocode(&self, address: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
            panic!("unexpected geocode lookup for {address}");
        }
    }

    fn records(values: serde_json::Value) -> Vec<PersonRecord> {
        serde_json::from_value(values).unwrap()
    }

    fn cache() -> GeocodeCache<UnreachableClient> {
        GeocodeCache::new(UnreachableClient)
    }

    #[test]
    fn staff_position_wins_over_patient() {
        let accounts = records(json!([{"id": 1, "email": "s@x.io", "full_name": "Sam"}]));
        let staff = records(json!([{"id": 10, "user_id": 1, "latitude": 43.0, "longitude": -79.0}]));
        let patients = records(json!([{"id": 20, "user_id": 1, "latitude": 44.0, "longitude": -78.0}]));

        let rows = resolve_rows(&accounts, &staff, &patients, &cache(), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, Some(PositionSource::Staff));
        assert_eq!(rows[0].latitude, Some(43.0));
        assert_eq!(rows[0].longitude, Some(-79.0));
    }

    #[test]
    fn patient_matched_by_email_only_resolves_as_patient() {
        // No user_id link on the patient profile; the case-insensitive email
        // fallback must find it.
        let accounts = records(json!([{"id": 2, "email": "Pat@Example.com", "full_name": "Pat"}]));
        let staff = records(json!([]));
        let patients =
            records(json!([{"id": 21, "email": "pat@example.COM", "lat": "45.5", "lng": "-73.6"}]));

        let rows = resolve_rows(&accounts, &staff, &patients, &cache(), None);
        assert_eq!(rows[0].source, Some(PositionSource::Patient));
        assert_eq!(rows[0].latitude, Some(45.5));
        assert_eq!(rows[0].longitude, Some(-73.6));
    }

    #[test]
    fn patient_matched_by_name_when_email_absent() {
        let accounts = records(json!([{"id": 3, "full_name": "Lee Quinn"}]));
        let staff = records(json!([]));
        let patients = records(json!([
            {"id": 22, "full_name": "LEE QUINN", "coords": {"lat": 51.0, "lng": -0.1}}
        ]));

        let rows = resolve_rows(&accounts, &staff, &patients, &cache(), None);
        assert_eq!(rows[0].source, Some(PositionSource::Patient));
        assert_eq!(rows[0].latitude, Some(51.0));
    }

    #[test]
    fn account_id_link_beats_email_match() {
        let accounts = records(json!([{"id": 4, "email": "a@b.c"}]));
        let staff = records(json!([]));
        let patients = records(json!([
            {"id": 23, "user_id": 4, "lat": 1.0, "lon": 2.0},
            {"id": 24, "email": "a@b.c", "lat": 3.0, "lon": 4.0}
        ]));

        let rows = resolve_rows(&accounts, &staff, &patients, &cache(), None);
        assert_eq!(rows[0].latitude, Some(1.0));
    }

    #[tokio::test]
    async fn address_only_row_is_emitted_unresolved_with_address_retained() {
        struct SilentClient;
        impl GeocodeClient for SilentClient {
            async fn geocode(
                &self,
                _address: &str,
            ) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
                Err(GeocodeError::NoUsableCandidate)
            }
        }

        let accounts = records(json!([{"id": 5, "email": "p@x.io", "full_name": "Pia"}]));
        let staff = records(json!([]));
        let patients = records(json!([{"id": 25, "user_id": 5, "address": "100 Queen St"}]));

        let rows = resolve_rows(&accounts, &staff, &patients, &GeocodeCache::new(SilentClient), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, None);
        assert_eq!(rows[0].latitude, None);
        assert_eq!(rows[0].longitude, None);
        assert_eq!(rows[0].address, "100 Queen St");
    }

    #[test]
    fn address_priority_is_patient_then_staff_then_account() {
        let accounts =
            records(json!([{"id": 6, "address": "account st"}, {"id": 7, "address": "account st"}]));
        let staff = records(json!([
            {"id": 30, "user_id": 6, "address": "staff st"},
            {"id": 31, "user_id": 7, "address": "staff st"}
        ]));
        let patients = records(json!([{"id": 26, "user_id": 6, "address": "patient st"}]));

        // Resolving would spawn lookups; run inside a runtime and inspect the
        // retained addresses only.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let rows = runtime.block_on(async {
            struct QuietClient;
            impl GeocodeClient for QuietClient {
                async fn geocode(
                    &self,
                    _address: &str,
                ) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
                    Err(GeocodeError::NoUsableCandidate)
                }
            }
            resolve_rows(&accounts, &staff, &patients, &GeocodeCache::new(QuietClient), None)
        });

        assert_eq!(rows[0].address, "patient st");
        assert_eq!(rows[1].address, "staff st");
    }

    #[test]
    fn org_filter_keeps_matching_and_fieldless_records() {
        let accounts = records(json!([
            {"id": 8, "organization": "east", "latitude": 1.0, "longitude": 2.0},
            {"id": 9, "organization": "west", "latitude": 3.0, "longitude": 4.0},
            {"id": 10, "latitude": 5.0, "longitude": 6.0}
        ]));

        let rows = resolve_rows(&accounts, &[], &[], &cache(), Some("east"));
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        // id 9 is excluded; id 10 has no org field and passes (fail-open).
        assert_eq!(ids, vec![8, 10]);
    }

    #[test]
    fn account_coordinates_alone_do_not_resolve_the_row() {
        // The account's own coordinate fields are not part of the resolution
        // order; without a linked profile the row stays unresolved.
        let accounts = records(json!([{"id": 11, "latitude": 1.0, "longitude": 2.0}]));
        let rows = resolve_rows(&accounts, &[], &[], &cache(), None);
        assert_eq!(rows[0].source, None);
        assert_eq!(rows[0].latitude, None);
    }
}
