// Delivery Routes - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod carriers;
pub mod config;
pub mod error;
pub mod loader;
pub mod records;
pub mod resolver;
pub mod routing;
pub mod session;
pub mod summary;

// Re-export commonly used types
pub use carriers::{CarrierDirectory, CarrierOrigin, COMPANY_ADDRESS, COMPANY_CITY};
pub use config::AppConfig;
pub use error::RouteError;
pub use loader::{load_records, load_records_from_bytes, SourceKind, Table};
pub use records::{carrier_codes, records_for_carrier, DeliveryRecord, REQUIRED_COLUMNS};
pub use resolver::{
    normalize_postal_code, resolve_destination, resolve_stops, unique_destinations,
    AddressResolver, CarrierStops, ResolvedStop,
};
pub use routing::{
    parse_directions_response, plan_route, GoogleDirectionsClient, Itinerary, LatLng, Leg,
    RoutePlan, RouteRequest, RoutingClient,
};
pub use session::{LoginOutcome, PasswordGate, Session};
pub use summary::RouteSummary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
