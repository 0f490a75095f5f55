use crate::routing::{LatLng, RoutePlan};
use serde::{Deserialize, Serialize};

/// What the user sees after "compute route"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub origin: String,
    /// Kilometres, rounded to 2 decimals
    pub distance_km: f64,
    /// Minutes, rounded to the nearest integer
    pub duration_min: u64,
    /// "1. <address>", "2. <address>", ...
    pub stops: Vec<String>,
    pub map_points: Vec<LatLng>,
}

impl RouteSummary {
    pub fn from_plan(plan: &RoutePlan) -> Self {
        RouteSummary {
            origin: plan.origin.clone(),
            distance_km: meters_to_km(plan.total_distance_m()),
            duration_min: seconds_to_minutes(plan.total_duration_s()),
            stops: numbered_labels(&plan.ordered_stops),
            map_points: plan.map_points(),
        }
    }

    /// Nothing was routed (no stops, or zero-length answer)
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty() || self.distance_km <= 0.0
    }
}

pub fn meters_to_km(meters: u64) -> f64 {
    (meters as f64 / 1000.0 * 100.0).round() / 100.0
}

pub fn seconds_to_minutes(seconds: u64) -> u64 {
    (seconds as f64 / 60.0).round() as u64
}

pub fn numbered_labels(stops: &[String]) -> Vec<String> {
    stops
        .iter()
        .enumerate()
        .map(|(i, stop)| format!("{}. {}", i + 1, stop))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Itinerary, Leg};

    #[test]
    fn test_rounding() {
        assert_eq!(meters_to_km(15456), 15.46);
        assert_eq!(meters_to_km(15454), 15.45);
        assert_eq!(meters_to_km(0), 0.0);
        assert_eq!(seconds_to_minutes(1230), 21); // 20.5 rounds up
        assert_eq!(seconds_to_minutes(1229), 20);
        assert_eq!(seconds_to_minutes(29), 0);
    }

    #[test]
    fn test_labels_numbered_from_one() {
        let labels = numbered_labels(&["Via Po 3, Torino".to_string(), "Via Roma 1, Milano".to_string()]);
        assert_eq!(labels, vec!["1. Via Po 3, Torino", "2. Via Roma 1, Milano"]);
    }

    #[test]
    fn test_summary_from_plan() {
        let here = LatLng { lat: 45.5, lng: 10.2 };
        let plan = RoutePlan {
            origin: "TRENTO".to_string(),
            ordered_stops: vec!["Via Verdi 2, 38100 Trento".to_string()],
            itinerary: Some(Itinerary {
                waypoint_order: vec![0],
                legs: vec![
                    Leg { distance_m: 4200, duration_s: 600, start: here, end: here },
                    Leg { distance_m: 4310, duration_s: 640, start: here, end: here },
                ],
            }),
        };

        let summary = RouteSummary::from_plan(&plan);
        assert_eq!(summary.distance_km, 8.51);
        assert_eq!(summary.duration_min, 21);
        assert_eq!(summary.stops, vec!["1. Via Verdi 2, 38100 Trento"]);
        assert_eq!(summary.map_points.len(), 3);
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_summary_of_skipped_route_is_zero() {
        let plan = RoutePlan {
            origin: "TRENTO".to_string(),
            ordered_stops: vec![],
            itinerary: None,
        };

        let summary = RouteSummary::from_plan(&plan);
        assert_eq!(summary.distance_km, 0.0);
        assert_eq!(summary.duration_min, 0);
        assert!(summary.is_empty());
    }
}
