//! Frequency tables over stored records
//!
//! Blank values are not counted. Cross tables are keyed by the column
//! value first, then the row value, and every column carries every row
//! value (zero-filled).

use std::collections::{BTreeMap, BTreeSet};

use fivewhy_common::{CategoricalField, Record};
use serde::Serialize;

/// Number of root causes listed in the summary
pub const TOP_ROOT_CAUSES: usize = 10;

pub type Counts = BTreeMap<String, usize>;
pub type CrossTable = BTreeMap<String, BTreeMap<String, usize>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_records: usize,
    pub departments: Counts,
    pub severity: Counts,
    /// Most frequent first; ties in label order
    pub top_root_causes: Vec<RankedCount>,
    pub equipment_types: Counts,
    pub shift_times: Counts,
    pub age_buckets: Counts,
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn value_counts<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Counts {
    let mut counts = Counts::new();
    for value in values.flatten().filter_map(non_blank) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

fn field_counts(records: &[Record], field: CategoricalField) -> Counts {
    value_counts(records.iter().map(|r| r.categorical(field)))
}

pub fn summary(records: &[Record]) -> Summary {
    let root_causes = value_counts(records.iter().map(|r| Some(r.root_cause.as_str())));
    let mut ranked: Vec<RankedCount> = root_causes
        .into_iter()
        .map(|(label, count)| RankedCount { label, count })
        .collect();
    // Stable sort keeps label order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_ROOT_CAUSES);

    Summary {
        total_records: records.len(),
        departments: field_counts(records, CategoricalField::Department),
        severity: field_counts(records, CategoricalField::Severity),
        top_root_causes: ranked,
        equipment_types: field_counts(records, CategoricalField::EquipmentType),
        shift_times: field_counts(records, CategoricalField::ShiftTime),
        age_buckets: field_counts(records, CategoricalField::MachineAgeBucket),
    }
}

/// Record counts per `YYYY-MM`; unparseable dates are skipped
pub fn monthly_trends(records: &[Record]) -> Counts {
    let mut counts = Counts::new();
    for date in records.iter().filter_map(Record::reported_on) {
        *counts.entry(date.format("%Y-%m").to_string()).or_insert(0) += 1;
    }
    counts
}

fn cross_table<R, C>(records: &[Record], row: R, column: C) -> CrossTable
where
    R: Fn(&Record) -> &str,
    C: Fn(&Record) -> &str,
{
    let pairs: Vec<(&str, &str)> = records
        .iter()
        .filter_map(|r| Some((non_blank(row(r))?, non_blank(column(r))?)))
        .collect();
    let rows: BTreeSet<&str> = pairs.iter().map(|(r, _)| *r).collect();

    let mut table = CrossTable::new();
    for (r, c) in &pairs {
        let column = table.entry(c.to_string()).or_insert_with(|| {
            rows.iter().map(|row| (row.to_string(), 0)).collect()
        });
        if let Some(count) = column.get_mut(*r) {
            *count += 1;
        }
    }
    table
}

/// Department counts per severity
pub fn department_stats(records: &[Record]) -> CrossTable {
    cross_table(records, |r| r.department.as_str(), |r| r.severity.as_str())
}

/// Root cause counts per equipment type
pub fn root_cause_stats(records: &[Record]) -> CrossTable {
    cross_table(records, |r| r.root_cause.as_str(), |r| r.equipment_type.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, root_cause: &str, department: &str, severity: &str, date: &str) -> Record {
        Record {
            equipment_id: id.to_string(),
            equipment_type: "Pump".to_string(),
            root_cause: root_cause.to_string(),
            department: department.to_string(),
            severity: severity.to_string(),
            date_reported: date.to_string(),
            ..Default::default()
        }
    }

    fn records() -> Vec<Record> {
        vec![
            record("1", "Wear", "Utilities", "high", "2024-01-03"),
            record("2", "Wear", "Utilities", "low", "2024-01-20"),
            record("3", "Misalignment", "Production", "high", "2024-02-11"),
            record("4", "Lubrication", "Production", "high", "not a date"),
            record("5", "Misalignment", "", "high", ""),
        ]
    }

    #[test]
    fn test_summary_counts_and_ranking() {
        let s = summary(&records());
        assert_eq!(s.total_records, 5);
        assert_eq!(s.departments["Utilities"], 2);
        assert_eq!(s.departments.len(), 2);
        assert_eq!(s.severity["high"], 4);
        assert_eq!(s.equipment_types["Pump"], 5);
        assert!(s.shift_times.is_empty());

        let ranked: Vec<(&str, usize)> = s
            .top_root_causes
            .iter()
            .map(|r| (r.label.as_str(), r.count))
            .collect();
        assert_eq!(ranked, vec![("Misalignment", 2), ("Wear", 2), ("Lubrication", 1)]);
    }

    #[test]
    fn test_top_root_causes_are_capped() {
        let many: Vec<Record> = (0..15)
            .map(|i| record(&i.to_string(), &format!("Cause {:02}", i), "Ops", "low", ""))
            .collect();
        assert_eq!(summary(&many).top_root_causes.len(), TOP_ROOT_CAUSES);
    }

    #[test]
    fn test_monthly_trends_skip_bad_dates() {
        let trends = monthly_trends(&records());
        assert_eq!(trends.len(), 2);
        assert_eq!(trends["2024-01"], 2);
        assert_eq!(trends["2024-02"], 1);
    }

    #[test]
    fn test_department_stats_are_zero_filled() {
        let stats = department_stats(&records());
        assert_eq!(stats["high"]["Production"], 2);
        assert_eq!(stats["high"]["Utilities"], 1);
        assert_eq!(stats["low"]["Production"], 0);
        assert_eq!(stats["low"]["Utilities"], 1);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_root_cause_stats() {
        let stats = root_cause_stats(&records());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["Pump"]["Misalignment"], 2);
        assert_eq!(stats["Pump"]["Wear"], 2);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(summary(&[]), Summary::default());
        assert!(monthly_trends(&[]).is_empty());
        assert!(department_stats(&[]).is_empty());
    }
}
