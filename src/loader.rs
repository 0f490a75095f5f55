// 📂 Table Loader - CSV / Excel → DeliveryRecord
// Reads the uploaded sheet, checks the columns, hands rows to the resolver

use crate::error::RouteError;
use crate::records::{
    DeliveryRecord, COL_CARRIER, COL_LOCALITY, COL_OVERRIDE_LOCALITY, COL_OVERRIDE_POSTAL_CODE,
    COL_POSTAL_CODE, COL_STREET, REQUIRED_COLUMNS,
};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

// ============================================================================
// SOURCE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Excel,
}

impl SourceKind {
    /// Detect source kind from the file extension
    ///
    /// `.csv` → Csv; `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods` → Excel
    pub fn detect(file_name: &str) -> Result<SourceKind, RouteError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(SourceKind::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(SourceKind::Excel),
            _ => Err(RouteError::Load(format!(
                "Unsupported file type: {} (expected .csv, .xlsx or .xls)",
                file_name
            ))),
        }
    }
}

// ============================================================================
// RAW TABLE
// ============================================================================

/// Header row plus data rows, every cell already rendered as text
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Required columns absent from the header row
    pub fn missing_columns(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .filter(|col| self.column_index(col).is_none())
            .map(|col| col.to_string())
            .collect()
    }

    /// Fail with the full required-column list if any is absent
    pub fn validate(&self) -> Result<(), RouteError> {
        let missing = self.missing_columns();
        if missing.is_empty() {
            return Ok(());
        }

        Err(RouteError::MissingColumns {
            required: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            missing,
        })
    }

    /// Validate, then map every row to a DeliveryRecord
    pub fn into_records(self) -> Result<Vec<DeliveryRecord>, RouteError> {
        self.validate()?;

        let carrier = self.column_index(COL_CARRIER);
        let street = self.column_index(COL_STREET);
        let locality = self.column_index(COL_LOCALITY);
        let postal = self.column_index(COL_POSTAL_CODE);
        let ovr_locality = self.column_index(COL_OVERRIDE_LOCALITY);
        let ovr_postal = self.column_index(COL_OVERRIDE_POSTAL_CODE);

        let cell = |row: &[String], idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
        };

        let records = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let row = row.as_slice();
                DeliveryRecord {
                    carrier_code: cell(row, carrier).trim().to_string(),
                    street_address: cell(row, street),
                    locality: cell(row, locality),
                    postal_code: cell(row, postal),
                    override_locality: cell(row, ovr_locality),
                    override_postal_code: cell(row, ovr_postal),
                    line_number: i + 2, // +2 because: 1-indexed + header row
                }
            })
            .collect();

        Ok(records)
    }
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

// ============================================================================
// CSV
// ============================================================================

pub fn read_csv_table<R: Read>(reader: R) -> Result<Table, RouteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| RouteError::Load(format!("Failed to read CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            RouteError::Load(format!("Failed to parse CSV line {}: {}", line_num + 2, e))
        })?;

        let row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if !is_blank_row(&row) {
            rows.push(row);
        }
    }

    Ok(Table { headers, rows })
}

// ============================================================================
// EXCEL
// ============================================================================

/// Render a cell the way a spreadsheet export prints it
///
/// Floats keep their `.0` (postal codes typed as numbers arrive as `25100.0`
/// and are cleaned later by the resolver). Errors and empties become "".
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format!("{:?}", f),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

fn read_first_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<Table, RouteError> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| RouteError::Load("Excel file contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| RouteError::Load(format!("Failed to read sheet '{}': {}", sheet_name, e)))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<String>>());

    let headers = rows.next().unwrap_or_default();
    let rows = rows.filter(|row| !is_blank_row(row)).collect();

    Ok(Table { headers, rows })
}

pub fn read_excel_table(path: &Path) -> Result<Table, RouteError> {
    let workbook = open_workbook_auto(path)
        .map_err(|e| RouteError::Load(format!("Failed to open Excel file: {}", e)))?;
    read_first_sheet(workbook)
}

pub fn read_excel_bytes(bytes: Vec<u8>) -> Result<Table, RouteError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| RouteError::Load(format!("Failed to open Excel file: {}", e)))?;
    read_first_sheet(workbook)
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Load and validate a delivery table from disk
pub fn load_records(path: &Path) -> Result<Vec<DeliveryRecord>, RouteError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let table = match SourceKind::detect(file_name)? {
        SourceKind::Csv => {
            let file = std::fs::File::open(path).map_err(|e| {
                RouteError::Load(format!("Failed to open file {}: {}", path.display(), e))
            })?;
            read_csv_table(file)?
        }
        SourceKind::Excel => read_excel_table(path)?,
    };

    let records = table.into_records()?;
    log::info!("Loaded {} delivery rows from {}", records.len(), path.display());
    Ok(records)
}

/// Load and validate an uploaded file held in memory
pub fn load_records_from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Vec<DeliveryRecord>, RouteError> {
    let table = match SourceKind::detect(file_name)? {
        SourceKind::Csv => read_csv_table(Cursor::new(bytes))?,
        SourceKind::Excel => read_excel_bytes(bytes)?,
    };

    let records = table.into_records()?;
    log::info!("Loaded {} delivery rows from upload {}", records.len(), file_name);
    Ok(records)
}
