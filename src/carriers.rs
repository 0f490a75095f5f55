// 🏠 Carrier home bases - where each route starts and ends
//
// Static table, built once at startup. A JSON file may add or replace entries
// (redeploy to change), nothing mutates it afterwards.

use crate::error::RouteError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// The company's own city. Carriers based here leave from the warehouse address.
pub const COMPANY_CITY: &str = "BRESCIA";

/// Full postal address of the company warehouse
pub const COMPANY_ADDRESS: &str =
    "Cieb S.p.A., Via Giovanni Battista Cacciamali, 62, 25125 Brescia BS, Italia";

const DEFAULT_HOME_BASES: &[(&str, &str)] = &[
    ("LINE", "BRESCIA"),
    ("LIN2", "BRESCIA"),
    ("DAM1", "BRESCIA"),
    ("DAM2", "BRESCIA"),
    ("MBE", "BRESCIA"),
    ("NEX1", "BRESCIA"),
    ("NEX2", "BRESCIA"),
    ("NEX3", "BRESCIA"),
    ("NEX4", "BRESCIA"),
    ("NEX5", "BRESCIA"),
    ("NEX6", "BRESCIA"),
    ("NEX7", "BRESCIA"),
    ("NEX8", "BRESCIA"),
    ("NEX9", "BRESCIA"),
    ("PAPA", "BRESCIA"),
    ("PAP2", "BRESCIA"),
    ("PAP3", "BRESCIA"),
    ("PEZZ", "BRESCIA"),
    ("PEZZ2", "BRESCIA"),
    ("CTM1", "CALDERARA DI RENO"),
    ("CTM2", "CALDERARA DI RENO"),
    ("CTM3", "CALDERARA DI RENO"),
    ("CTM4", "CALDERARA DI RENO"),
    ("CTM5", "CALDERARA DI RENO"),
    ("CTM6", "CALDERARA DI RENO"),
    ("TNT", "TRENTO"),
];

/// A carrier's resolved start/end point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierOrigin {
    pub carrier_code: String,
    pub home_city: String,
    /// Routable location string sent as both origin and destination
    pub location: String,
}

/// Lookup table carrier code → home base city
#[derive(Debug, Clone)]
pub struct CarrierDirectory {
    home_bases: HashMap<String, String>,
}

impl CarrierDirectory {
    /// Directory with the built-in carrier table
    pub fn new() -> Self {
        let home_bases = DEFAULT_HOME_BASES
            .iter()
            .map(|(code, city)| (code.to_string(), city.to_string()))
            .collect();

        CarrierDirectory { home_bases }
    }

    /// Directory with no entries; every carrier falls back to the company city
    pub fn empty() -> Self {
        CarrierDirectory {
            home_bases: HashMap::new(),
        }
    }

    /// Add or replace one carrier's home base
    pub fn with_home_base(mut self, carrier_code: &str, city: &str) -> Self {
        self.home_bases
            .insert(carrier_code.trim().to_string(), city.trim().to_string());
        self
    }

    /// Merge entries from a JSON object file: `{ "CODE": "CITY", ... }`
    pub fn load_overrides(mut self, path: &Path) -> Result<Self, RouteError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RouteError::Configuration(format!(
                "Failed to read carrier file {}: {}",
                path.display(),
                e
            ))
        })?;

        let entries: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| {
            RouteError::Configuration(format!(
                "Carrier file {} is not a JSON object of code -> city: {}",
                path.display(),
                e
            ))
        })?;

        log::info!(
            "Loaded {} carrier home bases from {}",
            entries.len(),
            path.display()
        );

        for (code, city) in entries {
            self = self.with_home_base(&code, &city);
        }

        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.home_bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.home_bases.is_empty()
    }

    /// Home base city; unknown carriers silently default to the company city
    pub fn home_city(&self, carrier_code: &str) -> &str {
        self.home_bases
            .get(carrier_code.trim())
            .map(|city| city.as_str())
            .unwrap_or(COMPANY_CITY)
    }

    /// Routable start/end location for a carrier. Never empty.
    pub fn resolve_origin(&self, carrier_code: &str) -> String {
        let city = self.home_city(carrier_code);

        if city.eq_ignore_ascii_case(COMPANY_CITY) || city.is_empty() {
            COMPANY_ADDRESS.to_string()
        } else {
            city.to_string()
        }
    }

    pub fn origin(&self, carrier_code: &str) -> CarrierOrigin {
        CarrierOrigin {
            carrier_code: carrier_code.trim().to_string(),
            home_city: self.home_city(carrier_code).to_string(),
            location: self.resolve_origin(carrier_code),
        }
    }
}

impl Default for CarrierDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_company_city_carrier_gets_full_address() {
        let directory = CarrierDirectory::new();
        assert_eq!(directory.resolve_origin("NEX4"), COMPANY_ADDRESS);
    }

    #[test]
    fn test_remote_carrier_gets_bare_city() {
        let directory = CarrierDirectory::new();
        assert_eq!(directory.resolve_origin("CTM3"), "CALDERARA DI RENO");
        assert_eq!(directory.resolve_origin("TNT"), "TRENTO");
    }

    #[test]
    fn test_unknown_carrier_defaults_to_company_address() {
        let directory = CarrierDirectory::new();
        assert_eq!(
            directory.resolve_origin("ZZZ9"),
            directory.resolve_origin("LINE")
        );
        assert_eq!(directory.resolve_origin(""), COMPANY_ADDRESS);
    }

    #[test]
    fn test_origin_carries_home_city() {
        let origin = CarrierDirectory::new().origin(" CTM1 ");
        assert_eq!(origin.carrier_code, "CTM1");
        assert_eq!(origin.home_city, "CALDERARA DI RENO");
        assert_eq!(origin.location, "CALDERARA DI RENO");
    }

    #[test]
    fn test_load_overrides_adds_and_replaces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"TNT": "ROVERETO", "GLS1": "VERONA", "NEX1": "Brescia"}}"#).unwrap();

        let directory = CarrierDirectory::new().load_overrides(file.path()).unwrap();

        assert_eq!(directory.resolve_origin("TNT"), "ROVERETO");
        assert_eq!(directory.resolve_origin("GLS1"), "VERONA");
        // City comparison ignores case
        assert_eq!(directory.resolve_origin("NEX1"), COMPANY_ADDRESS);
    }

    #[test]
    fn test_load_overrides_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();

        let err = CarrierDirectory::new()
            .load_overrides(file.path())
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
