//! Equipment failure record model
//!
//! A [`Record`] is one root-cause-analysis case: the reported issue, its 5-why
//! chain, the corrective action, and the categorical context the classifier
//! learns from. Records are validated once at the store boundary; everything
//! downstream works with the typed fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Date format used by `date_reported`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Categorical context fields consumed by the classifier
///
/// The declaration order is the canonical column order used for one-hot
/// encoding: the eight domain features first, then equipment type and
/// department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Environment,
    OperatingLoad,
    RecentMaintenance,
    Severity,
    ShiftTime,
    MachineAgeBucket,
    MaintenanceGapDays,
    FailureFrequency,
    EquipmentType,
    Department,
}

impl CategoricalField {
    /// Every categorical field in canonical column order
    pub const ALL: [CategoricalField; 10] = [
        CategoricalField::Environment,
        CategoricalField::OperatingLoad,
        CategoricalField::RecentMaintenance,
        CategoricalField::Severity,
        CategoricalField::ShiftTime,
        CategoricalField::MachineAgeBucket,
        CategoricalField::MaintenanceGapDays,
        CategoricalField::FailureFrequency,
        CategoricalField::EquipmentType,
        CategoricalField::Department,
    ];

    /// Domain features that are always part of the model input
    pub const DOMAIN: [CategoricalField; 8] = [
        CategoricalField::Environment,
        CategoricalField::OperatingLoad,
        CategoricalField::RecentMaintenance,
        CategoricalField::Severity,
        CategoricalField::ShiftTime,
        CategoricalField::MachineAgeBucket,
        CategoricalField::MaintenanceGapDays,
        CategoricalField::FailureFrequency,
    ];

    /// Column / JSON field name
    pub fn as_str(self) -> &'static str {
        match self {
            CategoricalField::Environment => "environment",
            CategoricalField::OperatingLoad => "operating_load",
            CategoricalField::RecentMaintenance => "recent_maintenance",
            CategoricalField::Severity => "severity",
            CategoricalField::ShiftTime => "shift_time",
            CategoricalField::MachineAgeBucket => "machine_age_bucket",
            CategoricalField::MaintenanceGapDays => "maintenance_gap_days",
            CategoricalField::FailureFrequency => "failure_frequency",
            CategoricalField::EquipmentType => "equipment_type",
            CategoricalField::Department => "department",
        }
    }

    /// Fallback used when a record has no value for this field
    pub fn default_value(self) -> &'static str {
        match self {
            CategoricalField::Environment => "clean",
            CategoricalField::OperatingLoad => "normal",
            CategoricalField::RecentMaintenance => "yes",
            CategoricalField::Severity => "medium",
            CategoricalField::ShiftTime => "day",
            CategoricalField::MachineAgeBucket => "mid",
            CategoricalField::MaintenanceGapDays => "moderate",
            CategoricalField::FailureFrequency => "medium",
            CategoricalField::EquipmentType | CategoricalField::Department => "unknown",
        }
    }

    /// Parse a field from its column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One equipment failure case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub equipment_id: String,
    #[serde(default)]
    pub equipment_type: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub root_cause: String,
    #[serde(default)]
    pub why1: String,
    #[serde(default)]
    pub why2: String,
    #[serde(default)]
    pub why3: String,
    #[serde(default)]
    pub why4: String,
    #[serde(default)]
    pub why5: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub severity: String,
    /// Calendar date (`YYYY-MM-DD`), empty when unknown
    #[serde(default)]
    pub date_reported: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_age_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_gap_days: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_maintenance: Option<String>,
    /// Provenance of the record (import file, manual entry, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Record {
    /// Validate a record before it enters the store
    ///
    /// Requires a non-blank `equipment_id` and `root_cause`; `date_reported`
    /// must be empty or a `YYYY-MM-DD` date.
    pub fn validate(&self) -> Result<()> {
        if self.equipment_id.trim().is_empty() {
            return Err(Error::InvalidInput("equipment_id must not be empty".to_string()));
        }
        if self.root_cause.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "root_cause must not be empty (equipment_id {})",
                self.equipment_id
            )));
        }
        if !self.date_reported.is_empty() && self.reported_on().is_none() {
            return Err(Error::InvalidInput(format!(
                "date_reported '{}' is not a YYYY-MM-DD date",
                self.date_reported
            )));
        }
        Ok(())
    }

    /// Copy with surrounding whitespace stripped from every field
    ///
    /// Optional fields that are blank after trimming become `None`.
    pub fn normalized(&self) -> Record {
        fn text(value: &str) -> String {
            value.trim().to_string()
        }
        fn opt(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Record {
            equipment_id: text(&self.equipment_id),
            equipment_type: text(&self.equipment_type),
            issue: text(&self.issue),
            root_cause: text(&self.root_cause),
            why1: text(&self.why1),
            why2: text(&self.why2),
            why3: text(&self.why3),
            why4: text(&self.why4),
            why5: text(&self.why5),
            solution: text(&self.solution),
            department: text(&self.department),
            severity: text(&self.severity),
            date_reported: text(&self.date_reported),
            shift_time: opt(&self.shift_time),
            machine_age_bucket: opt(&self.machine_age_bucket),
            maintenance_gap_days: opt(&self.maintenance_gap_days),
            failure_frequency: opt(&self.failure_frequency),
            environment: opt(&self.environment),
            operating_load: opt(&self.operating_load),
            recent_maintenance: opt(&self.recent_maintenance),
            source: opt(&self.source),
        }
    }

    /// Parsed `date_reported`, if it is a valid date
    pub fn reported_on(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date_reported.trim(), DATE_FORMAT).ok()
    }

    /// Non-blank value of a categorical field, without defaults applied
    pub fn categorical(&self, field: CategoricalField) -> Option<&str> {
        let value = match field {
            CategoricalField::Environment => self.environment.as_deref(),
            CategoricalField::OperatingLoad => self.operating_load.as_deref(),
            CategoricalField::RecentMaintenance => self.recent_maintenance.as_deref(),
            CategoricalField::Severity => Some(self.severity.as_str()),
            CategoricalField::ShiftTime => self.shift_time.as_deref(),
            CategoricalField::MachineAgeBucket => self.machine_age_bucket.as_deref(),
            CategoricalField::MaintenanceGapDays => self.maintenance_gap_days.as_deref(),
            CategoricalField::FailureFrequency => self.failure_frequency.as_deref(),
            CategoricalField::EquipmentType => Some(self.equipment_type.as_str()),
            CategoricalField::Department => Some(self.department.as_str()),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// The 5-why chain in order
    pub fn five_why(&self) -> [&str; 5] {
        [&self.why1, &self.why2, &self.why3, &self.why4, &self.why5]
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: RecordUpdate) {
        fn set(target: &mut String, value: Option<String>) {
            if let Some(value) = value {
                *target = value;
            }
        }
        fn set_opt(target: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *target = value;
            }
        }

        set(&mut self.equipment_type, update.equipment_type);
        set(&mut self.issue, update.issue);
        set(&mut self.root_cause, update.root_cause);
        set(&mut self.why1, update.why1);
        set(&mut self.why2, update.why2);
        set(&mut self.why3, update.why3);
        set(&mut self.why4, update.why4);
        set(&mut self.why5, update.why5);
        set(&mut self.solution, update.solution);
        set(&mut self.department, update.department);
        set(&mut self.severity, update.severity);
        set(&mut self.date_reported, update.date_reported);
        set_opt(&mut self.shift_time, update.shift_time);
        set_opt(&mut self.machine_age_bucket, update.machine_age_bucket);
        set_opt(&mut self.maintenance_gap_days, update.maintenance_gap_days);
        set_opt(&mut self.failure_frequency, update.failure_frequency);
        set_opt(&mut self.environment, update.environment);
        set_opt(&mut self.operating_load, update.operating_load);
        set_opt(&mut self.recent_maintenance, update.recent_maintenance);
        set_opt(&mut self.source, update.source);
    }
}

/// Partial record update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordUpdate {
    pub equipment_type: Option<String>,
    pub issue: Option<String>,
    pub root_cause: Option<String>,
    pub why1: Option<String>,
    pub why2: Option<String>,
    pub why3: Option<String>,
    pub why4: Option<String>,
    pub why5: Option<String>,
    pub solution: Option<String>,
    pub department: Option<String>,
    pub severity: Option<String>,
    pub date_reported: Option<String>,
    pub shift_time: Option<String>,
    pub machine_age_bucket: Option<String>,
    pub maintenance_gap_days: Option<String>,
    pub failure_frequency: Option<String>,
    pub environment: Option<String>,
    pub operating_load: Option<String>,
    pub recent_maintenance: Option<String>,
    pub source: Option<String>,
}

impl RecordUpdate {
    /// True when the update would not change anything
    pub fn is_empty(&self) -> bool {
        *self == RecordUpdate::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            equipment_id: "EQ-001".to_string(),
            equipment_type: "Pump".to_string(),
            issue: "Bearing overheating".to_string(),
            root_cause: "Inadequate lubrication".to_string(),
            severity: "high".to_string(),
            date_reported: "2024-03-15".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_id_and_label() {
        let mut record = sample();
        record.equipment_id = "  ".to_string();
        assert!(matches!(record.validate(), Err(Error::InvalidInput(_))));

        let mut record = sample();
        record.root_cause.clear();
        assert!(matches!(record.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_normalized_trims_every_field() {
        let record = Record {
            equipment_id: " EQ-001 ".to_string(),
            root_cause: "Inadequate lubrication ".to_string(),
            environment: Some("  dusty".to_string()),
            source: Some("   ".to_string()),
            ..sample()
        }
        .normalized();

        assert_eq!(record.equipment_id, "EQ-001");
        assert_eq!(record.root_cause, "Inadequate lubrication");
        assert_eq!(record.environment.as_deref(), Some("dusty"));
        assert_eq!(record.source, None);
        assert_eq!(record.issue, "Bearing overheating");
    }

    #[test]
    fn test_validate_rejects_bad_date() {
        let mut record = sample();
        record.date_reported = "15/03/2024".to_string();
        assert!(record.validate().is_err());

        record.date_reported.clear();
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_categorical_skips_blank_values() {
        let mut record = sample();
        record.environment = Some("   ".to_string());
        record.department.clear();
        assert_eq!(record.categorical(CategoricalField::Environment), None);
        assert_eq!(record.categorical(CategoricalField::Department), None);
        assert_eq!(record.categorical(CategoricalField::EquipmentType), Some("Pump"));
        assert_eq!(record.categorical(CategoricalField::ShiftTime), None);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in CategoricalField::ALL {
            assert_eq!(CategoricalField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(CategoricalField::from_name("why1"), None);
    }

    #[test]
    fn test_domain_defaults() {
        let defaults: Vec<&str> = CategoricalField::DOMAIN
            .iter()
            .map(|f| f.default_value())
            .collect();
        assert_eq!(
            defaults,
            vec!["clean", "normal", "yes", "medium", "day", "mid", "moderate", "medium"]
        );
    }

    #[test]
    fn test_apply_update_only_touches_given_fields() {
        let mut record = sample();
        let update = RecordUpdate {
            severity: Some("critical".to_string()),
            shift_time: Some("night".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        record.apply(update);
        assert_eq!(record.severity, "critical");
        assert_eq!(record.shift_time.as_deref(), Some("night"));
        assert_eq!(record.issue, "Bearing overheating");
        assert!(RecordUpdate::default().is_empty());
    }
}
