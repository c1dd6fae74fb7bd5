//! CSV export of the record store

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use chrono::Local;
use fivewhy_common::{db, Record};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// One CSV line; every column is always present
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    equipment_id: &'a str,
    equipment_type: &'a str,
    issue: &'a str,
    root_cause: &'a str,
    why1: &'a str,
    why2: &'a str,
    why3: &'a str,
    why4: &'a str,
    why5: &'a str,
    solution: &'a str,
    department: &'a str,
    severity: &'a str,
    date_reported: &'a str,
    shift_time: Option<&'a str>,
    machine_age_bucket: Option<&'a str>,
    maintenance_gap_days: Option<&'a str>,
    failure_frequency: Option<&'a str>,
    environment: Option<&'a str>,
    operating_load: Option<&'a str>,
    recent_maintenance: Option<&'a str>,
    source: Option<&'a str>,
}

impl<'a> From<&'a Record> for ExportRow<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            equipment_id: &record.equipment_id,
            equipment_type: &record.equipment_type,
            issue: &record.issue,
            root_cause: &record.root_cause,
            why1: &record.why1,
            why2: &record.why2,
            why3: &record.why3,
            why4: &record.why4,
            why5: &record.why5,
            solution: &record.solution,
            department: &record.department,
            severity: &record.severity,
            date_reported: &record.date_reported,
            shift_time: record.shift_time.as_deref(),
            machine_age_bucket: record.machine_age_bucket.as_deref(),
            maintenance_gap_days: record.maintenance_gap_days.as_deref(),
            failure_frequency: record.failure_frequency.as_deref(),
            environment: record.environment.as_deref(),
            operating_load: record.operating_load.as_deref(),
            recent_maintenance: record.recent_maintenance.as_deref(),
            source: record.source.as_deref(),
        }
    }
}

/// Header line followed by one line per record
pub fn records_to_csv(records: &[Record]) -> ApiResult<Vec<u8>> {
    let export_error = |e: String| ApiError::Internal(format!("CSV export failed: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(ExportRow::from(record))
            .map_err(|e| export_error(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| export_error(e.to_string()))
}

/// GET /export/csv
///
/// Every record as a CSV attachment; 404 when the store is empty.
pub async fn export_csv(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let records = db::find_all_records(&state.db).await?;
    if records.is_empty() {
        return Err(ApiError::NotFound("No data to export".to_string()));
    }

    let body = records_to_csv(&records)?;
    let filename = format!("equipment_data_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    info!("Exported {} records as {}", records.len(), filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    ))
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/export/csv", get(export_csv))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_optional_fields_keep_their_columns() {
        let records = vec![
            Record {
                equipment_id: "EQ-1".to_string(),
                root_cause: "Wear".to_string(),
                issue: "Noise, then vibration".to_string(),
                environment: Some("dusty".to_string()),
                ..Default::default()
            },
            Record {
                equipment_id: "EQ-2".to_string(),
                root_cause: "Misalignment".to_string(),
                ..Default::default()
            },
        ];
        let csv = String::from_utf8(records_to_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("equipment_id,equipment_type,issue,root_cause,"));
        assert!(lines[0].ends_with(",recent_maintenance,source"));
        let columns = lines[0].split(',').count();
        assert_eq!(lines[2].split(',').count(), columns);
        // Embedded commas are quoted
        assert!(lines[1].contains("\"Noise, then vibration\""));
    }
}
