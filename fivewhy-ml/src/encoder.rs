//! Feature encoder shared by training and inference
//!
//! Both the trainer and the inference engine build their inputs through
//! [`FeatureEncoder::encode`]; the encoder used at inference time is
//! reconstructed from the column list and defaults stored in the artifact, so
//! the two paths cannot drift apart.
//!
//! Encoding is a single defaulting pass: every categorical column receives
//! either the record's value or the documented fallback, so any record is
//! encodable.

use fivewhy_common::CategoricalField;
use serde::{Deserialize, Serialize};

/// Anything that can be turned into model features
pub trait FeatureSource {
    /// Free-text issue description, if present
    fn issue(&self) -> Option<&str>;

    /// Non-blank raw value of a categorical field (no defaults applied)
    fn categorical(&self, field: CategoricalField) -> Option<&str>;
}

impl<T: FeatureSource + ?Sized> FeatureSource for &T {
    fn issue(&self) -> Option<&str> {
        (**self).issue()
    }

    fn categorical(&self, field: CategoricalField) -> Option<&str> {
        (**self).categorical(field)
    }
}

impl FeatureSource for fivewhy_common::Record {
    fn issue(&self) -> Option<&str> {
        Some(self.issue.as_str()).filter(|s| !s.trim().is_empty())
    }

    fn categorical(&self, field: CategoricalField) -> Option<&str> {
        fivewhy_common::Record::categorical(self, field)
    }
}

/// Unlabelled case submitted for prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseDescription {
    pub issue: String,
    pub equipment_type: Option<String>,
    pub department: Option<String>,
    pub severity: Option<String>,
    pub environment: Option<String>,
    pub operating_load: Option<String>,
    pub recent_maintenance: Option<String>,
    pub shift_time: Option<String>,
    pub machine_age_bucket: Option<String>,
    pub maintenance_gap_days: Option<String>,
    pub failure_frequency: Option<String>,
}

impl CaseDescription {
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            ..Default::default()
        }
    }

    /// Set a categorical field by name
    pub fn with(mut self, field: CategoricalField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            CategoricalField::Environment => self.environment = value,
            CategoricalField::OperatingLoad => self.operating_load = value,
            CategoricalField::RecentMaintenance => self.recent_maintenance = value,
            CategoricalField::Severity => self.severity = value,
            CategoricalField::ShiftTime => self.shift_time = value,
            CategoricalField::MachineAgeBucket => self.machine_age_bucket = value,
            CategoricalField::MaintenanceGapDays => self.maintenance_gap_days = value,
            CategoricalField::FailureFrequency => self.failure_frequency = value,
            CategoricalField::EquipmentType => self.equipment_type = value,
            CategoricalField::Department => self.department = value,
        }
        self
    }
}

impl FeatureSource for CaseDescription {
    fn issue(&self) -> Option<&str> {
        Some(self.issue.as_str()).filter(|s| !s.trim().is_empty())
    }

    fn categorical(&self, field: CategoricalField) -> Option<&str> {
        let value = match field {
            CategoricalField::Environment => &self.environment,
            CategoricalField::OperatingLoad => &self.operating_load,
            CategoricalField::RecentMaintenance => &self.recent_maintenance,
            CategoricalField::Severity => &self.severity,
            CategoricalField::ShiftTime => &self.shift_time,
            CategoricalField::MachineAgeBucket => &self.machine_age_bucket,
            CategoricalField::MaintenanceGapDays => &self.maintenance_gap_days,
            CategoricalField::FailureFrequency => &self.failure_frequency,
            CategoricalField::EquipmentType => &self.equipment_type,
            CategoricalField::Department => &self.department,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// Fully populated model input for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedRecord {
    /// Issue text plus readable context tags
    pub text: String,
    /// One value per encoder column, in column order
    pub categorical: Vec<(CategoricalField, String)>,
}

impl EncodedRecord {
    pub fn value(&self, field: CategoricalField) -> Option<&str> {
        self.categorical
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds [`EncodedRecord`]s for a fixed, ordered list of categorical columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: Vec<CategoricalField>,
    defaults: Vec<(CategoricalField, String)>,
}

/// Context fields rendered as "<Tag>: <value>" into the text blob, in order
const TEXT_TAGS: [(CategoricalField, &str); 3] = [
    (CategoricalField::EquipmentType, "Equipment"),
    (CategoricalField::Department, "Department"),
    (CategoricalField::Severity, "Severity"),
];

impl FeatureEncoder {
    /// Encoder over `columns` using each field's documented default
    pub fn new(columns: Vec<CategoricalField>) -> Self {
        let defaults = columns
            .iter()
            .map(|field| (*field, field.default_value().to_string()))
            .collect();
        Self { columns, defaults }
    }

    /// Encoder with an explicit defaults table (as restored from an artifact)
    pub fn with_defaults(
        columns: Vec<CategoricalField>,
        defaults: Vec<(CategoricalField, String)>,
    ) -> Self {
        Self { columns, defaults }
    }

    /// Every categorical field
    pub fn standard() -> Self {
        Self::new(CategoricalField::ALL.to_vec())
    }

    /// Columns for a training set: the domain features always, equipment
    /// type and department only when at least one source carries them
    pub fn for_training<S: FeatureSource>(sources: &[S]) -> Self {
        let mut columns = CategoricalField::DOMAIN.to_vec();
        for field in [CategoricalField::EquipmentType, CategoricalField::Department] {
            if sources.iter().any(|s| s.categorical(field).is_some()) {
                columns.push(field);
            }
        }
        Self::new(columns)
    }

    pub fn columns(&self) -> &[CategoricalField] {
        &self.columns
    }

    pub fn defaults(&self) -> &[(CategoricalField, String)] {
        &self.defaults
    }

    fn default_for(&self, field: CategoricalField) -> &str {
        self.defaults
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| field.default_value())
    }

    /// Text blob: issue, then "Equipment:", "Department:", "Severity:" tags;
    /// absent values are skipped
    pub fn text<S: FeatureSource + ?Sized>(&self, source: &S) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if let Some(issue) = source.issue() {
            parts.push(issue.trim().to_string());
        }
        for (field, tag) in TEXT_TAGS {
            if let Some(value) = source.categorical(field) {
                parts.push(format!("{}: {}", tag, value.trim()));
            }
        }
        parts.join(" ")
    }

    pub fn encode<S: FeatureSource + ?Sized>(&self, source: &S) -> EncodedRecord {
        let categorical = self
            .columns
            .iter()
            .map(|field| {
                let value = source
                    .categorical(*field)
                    .map(|v| v.trim().to_string())
                    .unwrap_or_else(|| self.default_for(*field).to_string());
                (*field, value)
            })
            .collect();

        EncodedRecord {
            text: self.text(source),
            categorical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fivewhy_common::Record;

    fn record() -> Record {
        Record {
            equipment_id: "EQ-1".to_string(),
            equipment_type: "Pump".to_string(),
            issue: "Bearing overheating".to_string(),
            root_cause: "Inadequate lubrication".to_string(),
            department: "Maintenance".to_string(),
            severity: "high".to_string(),
            environment: Some("dusty".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_assembly_order() {
        let encoder = FeatureEncoder::standard();
        assert_eq!(
            encoder.text(&record()),
            "Bearing overheating Equipment: Pump Department: Maintenance Severity: high"
        );
    }

    #[test]
    fn test_text_skips_missing_fields() {
        let encoder = FeatureEncoder::standard();
        let case = CaseDescription::new("Pump vibration");
        assert_eq!(encoder.text(&case), "Pump vibration");

        let empty = CaseDescription::default();
        assert_eq!(encoder.text(&empty), "");
    }

    #[test]
    fn test_defaults_fill_missing_categoricals() {
        let encoder = FeatureEncoder::standard();
        let encoded = encoder.encode(&CaseDescription::new("noise"));

        assert_eq!(encoded.categorical.len(), CategoricalField::ALL.len());
        assert_eq!(encoded.value(CategoricalField::Environment), Some("clean"));
        assert_eq!(encoded.value(CategoricalField::OperatingLoad), Some("normal"));
        assert_eq!(encoded.value(CategoricalField::RecentMaintenance), Some("yes"));
        assert_eq!(encoded.value(CategoricalField::Severity), Some("medium"));
        assert_eq!(encoded.value(CategoricalField::ShiftTime), Some("day"));
        assert_eq!(encoded.value(CategoricalField::MachineAgeBucket), Some("mid"));
        assert_eq!(encoded.value(CategoricalField::MaintenanceGapDays), Some("moderate"));
        assert_eq!(encoded.value(CategoricalField::FailureFrequency), Some("medium"));
        assert_eq!(encoded.value(CategoricalField::EquipmentType), Some("unknown"));
    }

    #[test]
    fn test_record_values_used_verbatim() {
        let encoded = FeatureEncoder::standard().encode(&record());
        assert_eq!(encoded.value(CategoricalField::Environment), Some("dusty"));
        assert_eq!(encoded.value(CategoricalField::Severity), Some("high"));
        assert_eq!(encoded.value(CategoricalField::Department), Some("Maintenance"));
    }

    #[test]
    fn test_encoding_is_pure() {
        let encoder = FeatureEncoder::standard();
        let r = record();
        assert_eq!(encoder.encode(&r), encoder.encode(&r));
    }

    #[test]
    fn test_training_columns_follow_data() {
        let mut bare = record();
        bare.equipment_type.clear();
        bare.department.clear();

        let encoder = FeatureEncoder::for_training(&[bare.clone()]);
        assert_eq!(encoder.columns(), &CategoricalField::DOMAIN);

        let encoder = FeatureEncoder::for_training(&[bare, record()]);
        assert_eq!(encoder.columns().len(), 10);
        assert_eq!(encoder.columns()[8], CategoricalField::EquipmentType);
    }

    #[test]
    fn test_custom_defaults_table() {
        let encoder = FeatureEncoder::with_defaults(
            vec![CategoricalField::Environment],
            vec![(CategoricalField::Environment, "humid".to_string())],
        );
        let encoded = encoder.encode(&CaseDescription::new("x"));
        assert_eq!(encoded.categorical, vec![(CategoricalField::Environment, "humid".to_string())]);
    }
}
