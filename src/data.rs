use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::DataError;
use crate::settings::Paths;

pub const NOT_AVAILABLE: &str = "N/A";

// ── Records ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub name: String,
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub field: String,
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub telephone: String,
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub address: String,
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub location: String,
    #[serde(default = "not_available", deserialize_with = "or_not_available")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(rename = "Doctor Name")]
    pub name: String,
    #[serde(rename = "Specialty")]
    pub specialty: String,
}

impl Doctor {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Doctor {
            name: name.into(),
            specialty: specialty.into(),
        }
    }
}

/// One row of a claim's itemized charges, kept as display strings.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingLine {
    pub item: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub total: String,
}

impl BillingLine {
    pub fn new(item: &str, description: &str, quantity: &str, unit_price: &str, total: &str) -> Self {
        BillingLine {
            item: item.to_string(),
            description: description.to_string(),
            quantity: quantity.to_string(),
            unit_price: unit_price.to_string(),
            total: total.to_string(),
        }
    }

    pub fn cells(&self) -> [&str; 5] {
        [
            &self.item,
            &self.description,
            &self.quantity,
            &self.unit_price,
            &self.total,
        ]
    }
}

pub type SpecialtyTable = HashMap<String, Vec<String>>;

/// Diagnosis name → billing lines.
pub type BillingTable = HashMap<String, Vec<BillingLine>>;

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

fn or_not_available<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let s = Option::<String>::deserialize(d)?.unwrap_or_default();
    let s = s.trim();
    Ok(if s.is_empty() {
        not_available()
    } else {
        s.to_string()
    })
}

// ── Loading ──

pub struct ReferenceData {
    pub clinics: Vec<Clinic>,
    pub doctors: Vec<Doctor>,
    pub specialties: SpecialtyTable,
}

/// Load the clinic table, doctor table and specialty table. Any missing or
/// empty input is fatal.
pub fn load_data(paths: &Paths) -> Result<ReferenceData, DataError> {
    let clinics: Vec<Clinic> = read_csv(&paths.clinics_csv)?;
    let doctors: Vec<Doctor> = read_csv(&paths.doctors_csv)?;
    let specialties: SpecialtyTable = read_json(&paths.specialties_json)?;
    if specialties.is_empty() {
        return Err(DataError::Empty(paths.specialties_json.clone()));
    }

    info!(
        clinics = clinics.len(),
        doctors = doctors.len(),
        specialties = specialties.len(),
        "Loaded reference data"
    );
    Ok(ReferenceData {
        clinics,
        doctors,
        specialties,
    })
}

fn read_csv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    let rows = csv::Reader::from_reader(BufReader::new(file))
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DataError::csv(path, e))?;
    if rows.is_empty() {
        return Err(DataError::Empty(path.to_path_buf()));
    }
    Ok(rows)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, DataError> {
    let file = File::open(path).map_err(|e| DataError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| DataError::json(path, e))
}

/// Load the diagnosis billing table. An unreadable table is logged and treated
/// as empty, so every claim falls back to the default lines.
pub fn load_billing_items(path: &Path) -> BillingTable {
    match read_json::<Value>(path) {
        Ok(doc) => parse_billing_table(&doc),
        Err(e) => {
            error!("Error loading billing items: {}", e);
            BillingTable::new()
        }
    }
}

/// `{"diagnoses": {name: {"billing_items": [{"Item", "Description", "Quantity",
/// "Unit Price", "Total"}]}}}`. Numbers and strings are both accepted.
pub fn parse_billing_table(doc: &Value) -> BillingTable {
    let Some(diagnoses) = doc.get("diagnoses").and_then(Value::as_object) else {
        return BillingTable::new();
    };

    diagnoses
        .iter()
        .map(|(name, entry)| {
            let lines = entry
                .get("billing_items")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(billing_line_from_json).collect())
                .unwrap_or_default();
            (name.clone(), lines)
        })
        .collect()
}

fn billing_line_from_json(item: &Value) -> BillingLine {
    let cell = |key: &str| match item.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    BillingLine {
        item: cell("Item"),
        description: cell("Description"),
        quantity: cell("Quantity"),
        unit_price: cell("Unit Price"),
        total: cell("Total"),
    }
}

// ── Saving ──

/// Write records to CSV with headers taken from the record type. Zero records
/// skips the write.
pub fn save_csv<T: Serialize>(path: &Path, records: &[T], what: &str) -> Result<()> {
    if records.is_empty() {
        warn!("No {} to save.", what);
        return Ok(());
    }

    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Saved {} {} to {:?}", records.len(), what, path);
    Ok(())
}
