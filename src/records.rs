use serde::{Deserialize, Serialize};

// ============================================================================
// COLUMN NAMES (as they appear in the back-office export)
// ============================================================================

pub const COL_CARRIER: &str = "COD-VETTORE";
pub const COL_STREET: &str = "INDIRIZZO";
pub const COL_LOCALITY: &str = "LOCALITA";
pub const COL_POSTAL_CODE: &str = "CAP";
pub const COL_OVERRIDE_LOCALITY: &str = "MS-LOCALIT";
pub const COL_OVERRIDE_POSTAL_CODE: &str = "MS-CAP";

/// Columns the loader refuses to go without. CAP / MS-LOCALIT / MS-CAP load as "" when absent.
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_CARRIER, COL_STREET, COL_LOCALITY];

/// One row of the delivery table
///
/// Every field is the raw cell text. Absent columns and empty cells are "",
/// never missing, so address composition has nothing to unwrap.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct DeliveryRecord {
    #[serde(rename = "COD-VETTORE", default)]
    pub carrier_code: String,

    #[serde(rename = "INDIRIZZO", default)]
    pub street_address: String,

    #[serde(rename = "LOCALITA", default)]
    pub locality: String,

    #[serde(rename = "CAP", default)]
    pub postal_code: String,

    #[serde(rename = "MS-LOCALIT", default)]
    pub override_locality: String,

    #[serde(rename = "MS-CAP", default)]
    pub override_postal_code: String,

    /// Line in the source file (1-indexed, header is line 1)
    #[serde(skip)]
    pub line_number: usize,
}

impl DeliveryRecord {
    /// Create a record with the default locality pair only
    pub fn new(carrier_code: &str, street_address: &str, locality: &str, postal_code: &str) -> Self {
        DeliveryRecord {
            carrier_code: carrier_code.to_string(),
            street_address: street_address.to_string(),
            locality: locality.to_string(),
            postal_code: postal_code.to_string(),
            ..Default::default()
        }
    }

    /// Builder pattern: add the alternate destination pair
    pub fn with_override(mut self, locality: &str, postal_code: &str) -> Self {
        self.override_locality = locality.to_string();
        self.override_postal_code = postal_code.to_string();
        self
    }

    /// True when the alternate pair wins over the default one
    pub fn uses_override(&self) -> bool {
        !self.override_locality.trim().is_empty()
    }
}

// ============================================================================
// CARRIER SELECTION
// ============================================================================

/// Distinct non-blank carrier codes, sorted (the dashboard's carrier picker)
pub fn carrier_codes(records: &[DeliveryRecord]) -> Vec<String> {
    let mut codes: Vec<String> = records
        .iter()
        .map(|r| r.carrier_code.trim())
        .filter(|code| !code.is_empty())
        .map(|code| code.to_string())
        .collect();

    codes.sort();
    codes.dedup();
    codes
}

/// Rows belonging to one carrier, in file order
pub fn records_for_carrier(records: &[DeliveryRecord], carrier_code: &str) -> Vec<DeliveryRecord> {
    let wanted = carrier_code.trim();
    records
        .iter()
        .filter(|r| r.carrier_code.trim() == wanted)
        .cloned()
        .collect()
}
