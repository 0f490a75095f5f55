// 🗺️ Routing Client - hand the stops to the directions service
//
// The service owns the optimization. This module builds the request, parses
// the itinerary back, and maps the optimized order onto our address strings.

use crate::error::RouteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    pub departure_time: DateTime<Utc>,
}

impl RouteRequest {
    /// Round trip from a home base through every waypoint, leaving now
    pub fn round_trip(home: &str, waypoints: Vec<String>) -> Self {
        RouteRequest {
            origin: home.to_string(),
            destination: home.to_string(),
            waypoints,
            departure_time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub distance_m: u64,
    pub duration_s: u64,
    pub start: LatLng,
    pub end: LatLng,
}

/// What the service sends back for the first (best) route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    /// Optimized visiting order as indices into the submitted waypoints
    pub waypoint_order: Vec<usize>,
    pub legs: Vec<Leg>,
}

// ============================================================================
// ROUTING CLIENT TRAIT
// ============================================================================

/// RoutingClient - the only seam to the outside world
///
/// `Err(RouteError::EmptyRoute)` when the service finds no itinerary.
pub trait RoutingClient: Send + Sync {
    fn directions(&self, request: &RouteRequest) -> Result<Itinerary, RouteError>;

    fn name(&self) -> &str {
        "routing-service"
    }
}

// ============================================================================
// GOOGLE DIRECTIONS
// ============================================================================

pub struct GoogleDirectionsClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl GoogleDirectionsClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, RouteError> {
        if api_key.trim().is_empty() {
            return Err(RouteError::Configuration(
                "Directions API key is empty".to_string(),
            ));
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("delivery-routes/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RouteError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(GoogleDirectionsClient {
            http,
            api_key: api_key.trim().to_string(),
            base_url: DIRECTIONS_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn query(&self, request: &RouteRequest) -> Vec<(&'static str, String)> {
        let mut waypoints = String::from("optimize:true");
        for wp in &request.waypoints {
            // '|' separates waypoints, so it cannot appear inside one
            waypoints.push('|');
            waypoints.push_str(&wp.replace('|', " "));
        }

        vec![
            ("origin", request.origin.clone()),
            ("destination", request.destination.clone()),
            ("waypoints", waypoints),
            ("mode", "driving".to_string()),
            ("departure_time", request.departure_time.timestamp().to_string()),
            ("key", self.api_key.clone()),
        ]
    }
}

impl RoutingClient for GoogleDirectionsClient {
    fn directions(&self, request: &RouteRequest) -> Result<Itinerary, RouteError> {
        log::info!(
            "Requesting directions: {} waypoints from {}",
            request.waypoints.len(),
            request.origin
        );

        let response = self
            .http
            .get(&self.base_url)
            .query(&self.query(request))
            .send()
            .map_err(|e| RouteError::Routing(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RouteError::Routing(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let body: Value = response
            .json()
            .map_err(|e| RouteError::Routing(format!("Invalid JSON response: {}", e)))?;

        parse_directions_response(&body)
    }

    fn name(&self) -> &str {
        "Google Maps Directions"
    }
}

fn parse_lat_lng(value: &Value) -> Result<LatLng, RouteError> {
    let lat = value.get("lat").and_then(Value::as_f64);
    let lng = value.get("lng").and_then(Value::as_f64);

    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(LatLng { lat, lng }),
        _ => Err(RouteError::Routing("Leg location without lat/lng".to_string())),
    }
}

fn parse_leg(leg: &Value) -> Result<Leg, RouteError> {
    let metric = |field: &str| -> Result<u64, RouteError> {
        leg.get(field)
            .and_then(|f| f.get("value"))
            .and_then(Value::as_u64)
            .ok_or_else(|| RouteError::Routing(format!("Leg without {}.value", field)))
    };

    Ok(Leg {
        distance_m: metric("distance")?,
        duration_s: metric("duration")?,
        start: parse_lat_lng(leg.get("start_location").unwrap_or(&Value::Null))?,
        end: parse_lat_lng(leg.get("end_location").unwrap_or(&Value::Null))?,
    })
}

/// Turn a Directions API JSON body into an Itinerary
///
/// Status mapping:
/// - `OK` with at least one route → first route
/// - `ZERO_RESULTS`, `NOT_FOUND`, or no routes → `EmptyRoute`
/// - `REQUEST_DENIED` → `Configuration` (bad or unauthorized key)
/// - anything else → `Routing`
pub fn parse_directions_response(body: &Value) -> Result<Itinerary, RouteError> {
    let status = body.get("status").and_then(Value::as_str).unwrap_or("OK");
    let message = body
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or(status)
        .to_string();

    match status {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => return Err(RouteError::EmptyRoute),
        "REQUEST_DENIED" => return Err(RouteError::Configuration(message)),
        _ => return Err(RouteError::Routing(message)),
    }

    let route = body
        .get("routes")
        .and_then(Value::as_array)
        .and_then(|routes| routes.first())
        .ok_or(RouteError::EmptyRoute)?;

    let waypoint_order = route
        .get("waypoint_order")
        .and_then(Value::as_array)
        .map(|order| {
            order
                .iter()
                .map(|i| {
                    i.as_u64()
                        .map(|i| i as usize)
                        .ok_or_else(|| RouteError::Routing("Non-numeric waypoint index".to_string()))
                })
                .collect::<Result<Vec<usize>, RouteError>>()
        })
        .transpose()?
        .unwrap_or_default();

    let legs = route
        .get("legs")
        .and_then(Value::as_array)
        .map(|legs| legs.iter().map(parse_leg).collect::<Result<Vec<Leg>, RouteError>>())
        .transpose()?
        .unwrap_or_default();

    if legs.is_empty() {
        return Err(RouteError::EmptyRoute);
    }

    Ok(Itinerary { waypoint_order, legs })
}

// ============================================================================
// ROUTE PLAN
// ============================================================================

/// A carrier's route: optimized stop order plus the raw itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub origin: String,
    pub ordered_stops: Vec<String>,
    pub itinerary: Option<Itinerary>,
}

impl RoutePlan {
    fn empty(origin: &str) -> Self {
        RoutePlan {
            origin: origin.to_string(),
            ordered_stops: Vec::new(),
            itinerary: None,
        }
    }

    pub fn total_distance_m(&self) -> u64 {
        self.legs().iter().map(|l| l.distance_m).sum()
    }

    pub fn total_duration_s(&self) -> u64 {
        self.legs().iter().map(|l| l.duration_s).sum()
    }

    pub fn legs(&self) -> &[Leg] {
        self.itinerary.as_ref().map(|i| i.legs.as_slice()).unwrap_or(&[])
    }

    /// First leg's start, then every leg's end (for the map)
    pub fn map_points(&self) -> Vec<LatLng> {
        let legs = self.legs();
        let mut points = Vec::with_capacity(legs.len() + 1);

        if let Some(first) = legs.first() {
            points.push(first.start);
        }
        points.extend(legs.iter().map(|l| l.end));
        points
    }
}

/// Ask the service for a round trip through `waypoints`
///
/// Empty waypoints → no call at all, zero distance and duration.
pub fn plan_route(
    client: &dyn RoutingClient,
    home: &str,
    waypoints: &[String],
) -> Result<RoutePlan, RouteError> {
    if waypoints.is_empty() {
        log::debug!("No waypoints, skipping {}", client.name());
        return Ok(RoutePlan::empty(home));
    }

    let request = RouteRequest::round_trip(home, waypoints.to_vec());
    let itinerary = client.directions(&request)?;

    let ordered_stops = if itinerary.waypoint_order.is_empty() {
        waypoints.to_vec()
    } else {
        itinerary
            .waypoint_order
            .iter()
            .map(|&i| {
                waypoints.get(i).cloned().ok_or_else(|| {
                    RouteError::Routing(format!(
                        "Waypoint index {} out of range ({} submitted)",
                        i,
                        waypoints.len()
                    ))
                })
            })
            .collect::<Result<Vec<String>, RouteError>>()?
    };

    Ok(RoutePlan {
        origin: home.to_string(),
        ordered_stops,
        itinerary: Some(itinerary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records requests and replays a canned answer
    struct FakeClient {
        answer: Result<Itinerary, RouteError>,
        calls: Mutex<Vec<RouteRequest>>,
    }

    impl FakeClient {
        fn new(answer: Result<Itinerary, RouteError>) -> Self {
            FakeClient {
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RoutingClient for FakeClient {
        fn directions(&self, request: &RouteRequest) -> Result<Itinerary, RouteError> {
            self.calls.lock().unwrap().push(request.clone());
            self.answer.clone()
        }
    }

    fn leg(distance_m: u64, duration_s: u64, end_lat: f64) -> Leg {
        Leg {
            distance_m,
            duration_s,
            start: LatLng { lat: 45.5, lng: 10.2 },
            end: LatLng { lat: end_lat, lng: 10.0 },
        }
    }

    fn sample_body() -> Value {
        json!({
            "status": "OK",
            "routes": [{
                "waypoint_order": [1, 0],
                "legs": [
                    {
                        "distance": { "value": 12000, "text": "12 km" },
                        "duration": { "value": 900, "text": "15 mins" },
                        "start_location": { "lat": 45.53, "lng": 10.21 },
                        "end_location": { "lat": 45.46, "lng": 9.19 }
                    },
                    {
                        "distance": { "value": 3456, "text": "3.5 km" },
                        "duration": { "value": 330, "text": "6 mins" },
                        "start_location": { "lat": 45.46, "lng": 9.19 },
                        "end_location": { "lat": 45.53, "lng": 10.21 }
                    }
                ]
            }]
        })
    }

    #[test]
    fn test_parse_ok_response() {
        let itinerary = parse_directions_response(&sample_body()).unwrap();
        assert_eq!(itinerary.waypoint_order, vec![1, 0]);
        assert_eq!(itinerary.legs.len(), 2);
        assert_eq!(itinerary.legs[0].distance_m, 12000);
        assert_eq!(itinerary.legs[1].duration_s, 330);
        assert_eq!(itinerary.legs[0].end, LatLng { lat: 45.46, lng: 9.19 });
    }

    #[test]
    fn test_parse_zero_results_is_empty_route() {
        let body = json!({ "status": "ZERO_RESULTS", "routes": [] });
        assert_eq!(parse_directions_response(&body), Err(RouteError::EmptyRoute));

        let body = json!({ "status": "OK", "routes": [] });
        assert_eq!(parse_directions_response(&body), Err(RouteError::EmptyRoute));
    }

    #[test]
    fn test_parse_request_denied_is_configuration() {
        let body = json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "routes": []
        });
        let err = parse_directions_response(&body).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("API key is invalid"));
    }

    #[test]
    fn test_parse_malformed_leg() {
        let body = json!({
            "status": "OK",
            "routes": [{ "waypoint_order": [], "legs": [{ "distance": {} }] }]
        });
        assert!(matches!(parse_directions_response(&body), Err(RouteError::Routing(_))));
    }

    #[test]
    fn test_empty_waypoints_skip_the_service() {
        let client = FakeClient::new(Err(RouteError::EmptyRoute));
        let plan = plan_route(&client, "TRENTO", &[]).unwrap();

        assert_eq!(client.call_count(), 0);
        assert_eq!(plan.total_distance_m(), 0);
        assert_eq!(plan.total_duration_s(), 0);
        assert!(plan.ordered_stops.is_empty());
        assert!(plan.map_points().is_empty());
    }

    #[test]
    fn test_plan_applies_optimized_order() {
        let itinerary = Itinerary {
            waypoint_order: vec![2, 0, 1],
            legs: vec![leg(1000, 60, 1.0), leg(2000, 120, 2.0), leg(3000, 180, 3.0), leg(500, 30, 4.0)],
        };
        let client = FakeClient::new(Ok(itinerary));
        let waypoints = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        let plan = plan_route(&client, "TRENTO", &waypoints).unwrap();

        assert_eq!(plan.ordered_stops, vec!["C", "A", "B"]);
        assert_eq!(plan.total_distance_m(), 6500);
        assert_eq!(plan.total_duration_s(), 390);
        assert_eq!(plan.map_points().len(), 5);
        assert_eq!(plan.map_points()[0], LatLng { lat: 45.5, lng: 10.2 });

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].origin, "TRENTO");
        assert_eq!(calls[0].destination, "TRENTO");
        assert_eq!(calls[0].waypoints, waypoints);
    }

    #[test]
    fn test_plan_rejects_out_of_range_order() {
        let itinerary = Itinerary {
            waypoint_order: vec![0, 5],
            legs: vec![leg(1000, 60, 1.0)],
        };
        let client = FakeClient::new(Ok(itinerary));
        let waypoints = vec!["A".to_string(), "B".to_string()];

        assert!(matches!(
            plan_route(&client, "TRENTO", &waypoints),
            Err(RouteError::Routing(_))
        ));
    }

    #[test]
    fn test_plan_propagates_empty_route() {
        let client = FakeClient::new(Err(RouteError::EmptyRoute));
        let waypoints = vec!["Nowhere 1, Atlantis".to_string()];

        assert_eq!(plan_route(&client, "TRENTO", &waypoints), Err(RouteError::EmptyRoute));
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(GoogleDirectionsClient::new("  ", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_query_marks_waypoints_for_optimization() {
        let client = GoogleDirectionsClient::new("key-123", Duration::from_secs(5)).unwrap();
        let request = RouteRequest::round_trip(
            "TRENTO",
            vec!["Via Po 3, Torino".to_string(), "Via Roma 1, Milano".to_string()],
        );

        let query = client.query(&request);
        let waypoints = query.iter().find(|(k, _)| *k == "waypoints").unwrap();
        assert_eq!(waypoints.1, "optimize:true|Via Po 3, Torino|Via Roma 1, Milano");
        assert!(query.contains(&("mode", "driving".to_string())));
        assert!(query.contains(&("key", "key-123".to_string())));
    }

    #[test]
    fn test_pipe_inside_an_address_does_not_split_the_waypoint() {
        let client = GoogleDirectionsClient::new("key-123", Duration::from_secs(5)).unwrap();
        let request = RouteRequest::round_trip(
            "TRENTO",
            vec!["Via Po 3|Scala B, Torino".to_string(), "Via Roma 1, Milano".to_string()],
        );

        let query = client.query(&request);
        let waypoints = query.iter().find(|(k, _)| *k == "waypoints").unwrap();
        assert_eq!(waypoints.1, "optimize:true|Via Po 3 Scala B, Torino|Via Roma 1, Milano");
        assert_eq!(waypoints.1.matches('|').count(), request.waypoints.len());
    }
}
