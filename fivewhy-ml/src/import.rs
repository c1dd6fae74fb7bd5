//! Vendor dataset import
//!
//! The equipment dataset is exported as a JSON array of objects with
//! `Equipment_ID`, `Issue_Description`, `Why_1`..`Why_5` style keys. Each
//! object maps to one [`Record`]; the domain context fields fall back to
//! their defaults when the export lacks them.

use chrono::NaiveDate;
use fivewhy_common::record::DATE_FORMAT;
use fivewhy_common::{CategoricalField, Record};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON array of objects")]
    NotAnArray,

    #[error("dataset entry {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: fivewhy_common::Error,
    },
}

/// String value of `key`; numbers and booleans are rendered, null and
/// blank strings are treated as absent
fn field(item: &Map<String, Value>, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_or_default(item: &Map<String, Value>, key: &str, field_kind: CategoricalField) -> Option<String> {
    Some(field(item, key).unwrap_or_else(|| field_kind.default_value().to_string()))
}

/// Map one export object to a record; `today` fills a missing report date
pub fn vendor_record(item: &Map<String, Value>, today: NaiveDate) -> Record {
    let text = |key: &str| field(item, key).unwrap_or_default();

    Record {
        equipment_id: text("Equipment_ID"),
        equipment_type: text("Equipment_Type"),
        issue: text("Issue_Description"),
        root_cause: text("Root_Cause"),
        why1: text("Why_1"),
        why2: text("Why_2"),
        why3: text("Why_3"),
        why4: text("Why_4"),
        why5: text("Why_5"),
        solution: text("Corrective_Action"),
        department: text("Department"),
        severity: text("Severity"),
        date_reported: field(item, "Date_Reported")
            .unwrap_or_else(|| today.format(DATE_FORMAT).to_string()),
        shift_time: field_or_default(item, "shift_time", CategoricalField::ShiftTime),
        machine_age_bucket: field_or_default(item, "machine_age_bucket", CategoricalField::MachineAgeBucket),
        maintenance_gap_days: field_or_default(
            item,
            "maintenance_gap_days",
            CategoricalField::MaintenanceGapDays,
        ),
        failure_frequency: field_or_default(item, "failure_frequency", CategoricalField::FailureFrequency),
        environment: Some(CategoricalField::Environment.default_value().to_string()),
        operating_load: Some(CategoricalField::OperatingLoad.default_value().to_string()),
        recent_maintenance: Some(CategoricalField::RecentMaintenance.default_value().to_string()),
        source: field(item, "Source"),
    }
}

/// Parse and validate an export; later duplicates of an equipment id are
/// dropped with a warning
pub fn parse_dataset(json: &str, today: NaiveDate) -> Result<Vec<Record>, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };

    let mut seen = BTreeSet::new();
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(item) = item else {
            return Err(ImportError::NotAnArray);
        };
        let record = vendor_record(item, today);
        record
            .validate()
            .map_err(|source| ImportError::InvalidRecord { index, source })?;

        if !seen.insert(record.equipment_id.clone()) {
            warn!("Duplicate equipment id {} at entry {}, skipped", record.equipment_id, index);
            continue;
        }
        records.push(record);
    }

    info!("Parsed {} records from dataset", records.len());
    Ok(records)
}

pub fn load_dataset(path: &Path, today: NaiveDate) -> Result<Vec<Record>, ImportError> {
    let json = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(&json, today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_vendor_keys_are_mapped() {
        let json = r#"[{
            "Equipment_ID": "EQ-100",
            "Equipment_Type": "Pump",
            "Department": "Utilities",
            "Severity": "High",
            "Issue_Description": "Bearing running hot",
            "Root_Cause": "Inadequate lubrication",
            "Why_1": "Bearing hot", "Why_2": "Grease dry", "Why_3": "Missed PM",
            "Why_4": "No schedule", "Why_5": "No CMMS",
            "Corrective_Action": "Add lubrication schedule",
            "Date_Reported": "2024-01-15",
            "shift_time": "night",
            "maintenance_gap_days": 45,
            "Source": "CMMS"
        }]"#;
        let records = parse_dataset(json, today()).unwrap();
        let r = &records[0];

        assert_eq!(r.equipment_id, "EQ-100");
        assert_eq!(r.issue, "Bearing running hot");
        assert_eq!(r.why5, "No CMMS");
        assert_eq!(r.solution, "Add lubrication schedule");
        assert_eq!(r.shift_time.as_deref(), Some("night"));
        assert_eq!(r.maintenance_gap_days.as_deref(), Some("45"));
        assert_eq!(r.machine_age_bucket.as_deref(), Some("mid"));
        assert_eq!(r.environment.as_deref(), Some("clean"));
        assert_eq!(r.source.as_deref(), Some("CMMS"));
    }

    #[test]
    fn test_missing_date_defaults_to_today() {
        let json = r#"[{"Equipment_ID": "EQ-1", "Root_Cause": "Wear"}]"#;
        let records = parse_dataset(json, today()).unwrap();
        assert_eq!(records[0].date_reported, "2024-03-09");
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let json = r#"[
            {"Equipment_ID": "EQ-1", "Root_Cause": "Wear"},
            {"Equipment_ID": "EQ-1", "Root_Cause": "Misalignment"}
        ]"#;
        let records = parse_dataset(json, today()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].root_cause, "Wear");
    }

    #[test]
    fn test_invalid_entries_are_reported() {
        let json = r#"[{"Equipment_ID": "EQ-1"}]"#;
        assert!(matches!(
            parse_dataset(json, today()),
            Err(ImportError::InvalidRecord { index: 0, .. })
        ));
        assert!(matches!(parse_dataset("{}", today()), Err(ImportError::NotAnArray)));
    }
}
