// 📍 Address Resolver - delivery rows → routable destination strings
// One explicit per-record function, mapped over the carrier's rows

use crate::carriers::{CarrierDirectory, CarrierOrigin};
use crate::records::{records_for_carrier, DeliveryRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// PER-RECORD RESOLUTION
// ============================================================================

/// Strip the `.0` a spreadsheet adds when a postal code was stored as a number
///
/// Only `<digits>.0` is touched. Everything else (already clean codes,
/// alphanumeric codes, garbage) passes through unchanged, so the function is
/// idempotent.
pub fn normalize_postal_code(raw: &str) -> &str {
    match raw.strip_suffix(".0") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits,
        _ => raw,
    }
}

/// Compose the destination address of one delivery row
///
/// The override pair wins when its locality is non-blank; otherwise the
/// default pair is used. The two pairs are never mixed.
pub fn resolve_destination(record: &DeliveryRecord) -> String {
    let (locality, postal_code) = if record.uses_override() {
        (&record.override_locality, &record.override_postal_code)
    } else {
        (&record.locality, &record.postal_code)
    };

    let postal_code = normalize_postal_code(postal_code);
    let street = record.street_address.as_str();

    let full = if postal_code.is_empty() {
        format!("{}, {}", street, locality)
    } else {
        format!("{}, {} {}", street, postal_code, locality)
    };

    full.trim().to_string()
}

/// Resolve every row and keep the first occurrence of each address
pub fn unique_destinations(records: &[DeliveryRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut destinations = Vec::new();

    for record in records {
        let address = resolve_destination(record);
        if seen.insert(address.clone()) {
            destinations.push(address);
        }
    }

    destinations
}

// ============================================================================
// RESOLVED STOPS
// ============================================================================

/// One unique destination and how many rows collapsed into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStop {
    pub full_address: String,
    pub deliveries: usize,
}

/// Same ordering as `unique_destinations`, with row counts
pub fn resolve_stops(records: &[DeliveryRecord]) -> Vec<ResolvedStop> {
    let mut stops: Vec<ResolvedStop> = Vec::new();

    for record in records {
        let address = resolve_destination(record);
        match stops.iter_mut().find(|s| s.full_address == address) {
            Some(stop) => stop.deliveries += 1,
            None => stops.push(ResolvedStop {
                full_address: address,
                deliveries: 1,
            }),
        }
    }

    stops
}

/// Everything needed to ask for one carrier's route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierStops {
    pub origin: CarrierOrigin,
    pub deliveries: usize,
    pub stops: Vec<ResolvedStop>,
}

impl CarrierStops {
    /// Waypoint strings in submission order
    pub fn destinations(&self) -> Vec<String> {
        self.stops.iter().map(|s| s.full_address.clone()).collect()
    }
}

// ============================================================================
// ADDRESS RESOLVER
// ============================================================================

pub struct AddressResolver {
    carriers: CarrierDirectory,
}

impl AddressResolver {
    pub fn new(carriers: CarrierDirectory) -> Self {
        AddressResolver { carriers }
    }

    pub fn carriers(&self) -> &CarrierDirectory {
        &self.carriers
    }

    pub fn resolve_destination(&self, record: &DeliveryRecord) -> String {
        resolve_destination(record)
    }

    pub fn unique_destinations(&self, records: &[DeliveryRecord]) -> Vec<String> {
        unique_destinations(records)
    }

    pub fn resolve_origin(&self, carrier_code: &str) -> String {
        self.carriers.resolve_origin(carrier_code)
    }

    /// Filter the full table to one carrier and resolve its stops
    pub fn stops_for(&self, records: &[DeliveryRecord], carrier_code: &str) -> CarrierStops {
        let rows = records_for_carrier(records, carrier_code);
        let stops = resolve_stops(&rows);

        log::debug!(
            "Carrier {}: {} rows → {} unique stops",
            carrier_code,
            rows.len(),
            stops.len()
        );

        CarrierStops {
            origin: self.carriers.origin(carrier_code),
            deliveries: rows.len(),
            stops,
        }
    }
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(CarrierDirectory::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::COMPANY_ADDRESS;

    fn record(street: &str, locality: &str, postal: &str, ovr_loc: &str, ovr_postal: &str) -> DeliveryRecord {
        DeliveryRecord::new("NEX1", street, locality, postal).with_override(ovr_loc, ovr_postal)
    }

    #[test]
    fn test_normalize_strips_float_suffix() {
        assert_eq!(normalize_postal_code("25100.0"), "25100");
        assert_eq!(normalize_postal_code("00100.0"), "00100");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for code in ["25100.0", "25100", "AB1 2CD", "", "1.0.0", ".0", "12a.0"] {
            let once = normalize_postal_code(code);
            assert_eq!(normalize_postal_code(once), once, "input {:?}", code);
        }
    }

    #[test]
    fn test_normalize_leaves_other_formats_alone() {
        assert_eq!(normalize_postal_code("25100"), "25100");
        assert_eq!(normalize_postal_code("AB1 2CD"), "AB1 2CD");
        assert_eq!(normalize_postal_code("25100.5"), "25100.5");
        assert_eq!(normalize_postal_code(".0"), ".0");
        assert_eq!(normalize_postal_code("12a.0"), "12a.0");
    }

    #[test]
    fn test_default_pair_when_override_blank() {
        let r = record("Via Roma 1", "Milano", "20100.0", "", "10100");
        assert_eq!(resolve_destination(&r), "Via Roma 1, 20100 Milano");

        let r = record("Via Roma 1", "Milano", "20100", "   ", "10100");
        assert_eq!(resolve_destination(&r), "Via Roma 1, 20100 Milano");
    }

    #[test]
    fn test_override_pair_wins_when_populated() {
        let r = record("Via Roma 1", "Milano", "20100", "Torino", "10100.0");
        assert_eq!(resolve_destination(&r), "Via Roma 1, 10100 Torino");
    }

    #[test]
    fn test_override_never_mixes_with_default_postal() {
        // Override locality without its own postal code: default CAP is NOT borrowed
        let r = record("Via Roma 1", "Milano", "20100", "Torino", "");
        assert_eq!(resolve_destination(&r), "Via Roma 1, Torino");
    }

    #[test]
    fn test_missing_postal_code_has_no_stray_space() {
        let r = record("Via Dante 4", "Brescia", "", "", "");
        assert_eq!(resolve_destination(&r), "Via Dante 4, Brescia");
    }

    #[test]
    fn test_empty_record_degrades_without_failing() {
        let r = DeliveryRecord::default();
        assert_eq!(resolve_destination(&r), ",");

        let r = record("", "Brescia", "25100.0", "", "");
        assert_eq!(resolve_destination(&r), ", 25100 Brescia");
    }

    #[test]
    fn test_output_contains_street() {
        let r = record("Piazza Loggia 7", "", "", "", "");
        let out = resolve_destination(&r);
        assert!(out.contains("Piazza Loggia 7"));
    }

    #[test]
    fn test_unique_destinations_first_occurrence_order() {
        let a = record("A street", "Brescia", "25100", "", "");
        let b = record("B street", "Brescia", "25100", "", "");
        let c = record("C street", "Brescia", "25100", "", "");

        let out = unique_destinations(&[a.clone(), b.clone(), a, c, b]);
        assert_eq!(
            out,
            vec![
                "A street, 25100 Brescia",
                "B street, 25100 Brescia",
                "C street, 25100 Brescia",
            ]
        );
    }

    #[test]
    fn test_unique_destinations_dedups_after_normalization() {
        let a = record("Via Roma 1", "Milano", "20100.0", "", "");
        let b = record("Via Roma 1", "Milano", "20100", "", "");
        assert_eq!(unique_destinations(&[a, b]).len(), 1);
    }

    #[test]
    fn test_unique_destinations_empty_input() {
        assert!(unique_destinations(&[]).is_empty());
    }

    #[test]
    fn test_same_street_different_city_stays_distinct() {
        let first = record("Via Roma 1", "Milano", "20100.0", "", "");
        let second = record("Via Roma 1", "Milano", "20100", "Torino", "10100");

        let out = unique_destinations(&[first, second]);
        assert_eq!(out, vec!["Via Roma 1, 20100 Milano", "Via Roma 1, 10100 Torino"]);
    }

    #[test]
    fn test_resolve_stops_counts_collapsed_rows() {
        let a = record("Via Roma 1", "Milano", "20100", "", "");
        let b = record("Via Po 3", "Torino", "10100", "", "");

        let stops = resolve_stops(&[a.clone(), b, a]);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].deliveries, 2);
        assert_eq!(stops[1].deliveries, 1);
    }

    #[test]
    fn test_stops_for_filters_carrier_and_resolves_origin() {
        let resolver = AddressResolver::default();
        let records = vec![
            DeliveryRecord::new("CTM2", "Via Emilia 5", "Bologna", "40100.0"),
            DeliveryRecord::new("NEX1", "Via Roma 1", "Milano", "20100"),
            DeliveryRecord::new("CTM2", "Via Emilia 5", "Bologna", "40100"),
        ];

        let stops = resolver.stops_for(&records, "CTM2");
        assert_eq!(stops.origin.location, "CALDERARA DI RENO");
        assert_eq!(stops.deliveries, 2);
        assert_eq!(stops.destinations(), vec!["Via Emilia 5, 40100 Bologna"]);

        let unknown = resolver.stops_for(&records, "NOPE");
        assert_eq!(unknown.origin.location, COMPANY_ADDRESS);
        assert!(unknown.stops.is_empty());
    }
}
