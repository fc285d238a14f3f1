//! Great-circle distance and the assigned-patient proximity report.
//!
//! Distances use the haversine formula on a spherical Earth - adequate for
//! proximity display, no geodetic projection attempted.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::roster::PersonRecord;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Calculate the great-circle distance between two positions in kilometers.
///
/// Deterministic and symmetric; identical points yield exactly zero.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1 * DEG_TO_RAD;
    let lat2_rad = lat2 * DEG_TO_RAD;
    let delta_lat = (lat2 - lat1) * DEG_TO_RAD;
    let delta_lon = (lon2 - lon1) * DEG_TO_RAD;

    // Haversine formula
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Assignment linking a staff member to a service request.
#[derive(Debug, Clone, Deserialize)]
pub struct Assignment {
    pub id: i64,
    #[serde(default)]
    pub staff_id: Option<i64>,
    pub service_request_id: i64,
}

/// Service request linking an assignment to a patient.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRequest {
    pub id: i64,
    pub patient_id: i64,
}

/// One assigned patient with its distance from the staff point.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentDistance {
    pub patient_id: i64,
    pub name: String,
    pub email: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Absent when either the staff point or the patient is unresolved.
    pub distance_km: Option<f64>,
}

/// The staff point for proximity: the live device position when available,
/// else the staff profile's resolved position.
pub fn effective_staff_position(
    profile: Option<(f64, f64)>,
    device: Option<(f64, f64)>,
) -> Option<(f64, f64)> {
    device.or(profile)
}

/// Build the proximity report for one staff member.
///
/// Walks assignment -> service request -> patient, resolves each patient's
/// position, and annotates the pair with its distance from `staff_position`.
/// Pairs survive with an absent distance when either side is unresolved;
/// assignments whose request or patient no longer exists are skipped.
pub fn assigned_patient_distances(
    staff_id: i64,
    staff_position: Option<(f64, f64)>,
    assignments: &[Assignment],
    service_requests: &[ServiceRequest],
    patients: &[PersonRecord],
) -> Vec<AssignmentDistance> {
    let requests_by_id: HashMap<i64, &ServiceRequest> =
        service_requests.iter().map(|r| (r.id, r)).collect();
    let patients_by_id: HashMap<i64, &PersonRecord> = patients.iter().map(|p| (p.id, p)).collect();

    let mut rows = Vec::new();
    for assignment in assignments
        .iter()
        .filter(|a| a.staff_id == Some(staff_id))
    {
        let Some(request) = requests_by_id.get(&assignment.service_request_id) else {
            continue;
        };
        let Some(patient) = patients_by_id.get(&request.patient_id) else {
            continue;
        };

        let position = patient.position();
        let distance = match (staff_position, position) {
            (Some((slat, slon)), Some((plat, plon))) => {
                Some(distance_km(slat, slon, plat, plon))
            }
            _ => None,
        };

        rows.push(AssignmentDistance {
            patient_id: patient.id,
            name: patient.full_name.clone().unwrap_or_default(),
            email: patient.email.clone().unwrap_or_default(),
            address: patient.address.clone().unwrap_or_default(),
            latitude: position.map(|p| p.0),
            longitude: position.map(|p| p.1),
            distance_km: distance,
        });
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_points_are_zero_distance() {
        assert_eq!(distance_km(43.6532, -79.3832, 43.6532, -79.3832), 0.0);
    }

    #[test]
    fn quarter_circumference_along_equator() {
        // (0,0) to (0,90) is a quarter of Earth's circumference.
        let distance = distance_km(0.0, 0.0, 0.0, 90.0);
        let expected = 10_007.5;
        assert!(
            (distance - expected).abs() < expected * 0.01,
            "expected ~{expected} km, got {distance}"
        );
    }

    #[test]
    fn distance_is_symmetric() {
        let forward = distance_km(43.65, -79.38, 45.50, -73.57);
        let backward = distance_km(45.50, -73.57, 43.65, -79.38);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn distance_grows_with_angular_separation() {
        let near = distance_km(0.0, 0.0, 0.0, 1.0);
        let far = distance_km(0.0, 0.0, 0.0, 2.0);
        let farther = distance_km(0.0, 0.0, 0.0, 10.0);
        assert!(near < far && far < farther);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((distance - 111.2).abs() < 1.0);
    }

    fn patients() -> Vec<PersonRecord> {
        serde_json::from_value(json!([
            {"id": 1, "full_name": "Pat One", "email": "one@x.io", "address": "1 First St",
             "latitude": 43.70, "longitude": -79.40},
            {"id": 2, "full_name": "Pat Two", "address": "2 Second St"}
        ]))
        .unwrap()
    }

    fn assignments() -> Vec<Assignment> {
        serde_json::from_value(json!([
            {"id": 100, "staff_id": 9, "service_request_id": 50},
            {"id": 101, "staff_id": 9, "service_request_id": 51},
            {"id": 102, "staff_id": 8, "service_request_id": 52},
            {"id": 103, "staff_id": null, "service_request_id": 50}
        ]))
        .unwrap()
    }

    fn requests() -> Vec<ServiceRequest> {
        serde_json::from_value(json!([
            {"id": 50, "patient_id": 1},
            {"id": 51, "patient_id": 2},
            {"id": 52, "patient_id": 1}
        ]))
        .unwrap()
    }

    #[test]
    fn report_covers_only_the_requested_staff() {
        let rows = assigned_patient_distances(
            9,
            Some((43.6532, -79.3832)),
            &assignments(),
            &requests(),
            &patients(),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].patient_id, 1);
        let distance = rows[0].distance_km.unwrap();
        assert!(distance > 0.0 && distance < 20.0);

        // Patient without coordinates keeps its row, distance absent.
        assert_eq!(rows[1].patient_id, 2);
        assert_eq!(rows[1].latitude, None);
        assert_eq!(rows[1].distance_km, None);
        assert_eq!(rows[1].address, "2 Second St");
    }

    #[test]
    fn missing_staff_point_leaves_distances_absent() {
        let rows =
            assigned_patient_distances(9, None, &assignments(), &requests(), &patients());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.distance_km.is_none()));
        // Patient coordinates are still reported.
        assert_eq!(rows[0].latitude, Some(43.70));
    }

    #[test]
    fn dangling_request_or_patient_is_skipped() {
        let assignments: Vec<Assignment> = serde_json::from_value(json!([
            {"id": 100, "staff_id": 9, "service_request_id": 999}
        ]))
        .unwrap();
        let rows = assigned_patient_distances(
            9,
            Some((0.0, 0.0)),
            &assignments,
            &requests(),
            &patients(),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn device_position_overrides_profile_position() {
        assert_eq!(
            effective_staff_position(Some((1.0, 2.0)), Some((3.0, 4.0))),
            Some((3.0, 4.0))
        );
        assert_eq!(effective_staff_position(Some((1.0, 2.0)), None), Some((1.0, 2.0)));
        assert_eq!(effective_staff_position(None, None), None);
    }
}
