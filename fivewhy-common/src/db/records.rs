//! Equipment record persistence
//!
//! Records are validated here, once, before they are written. Reads map rows
//! straight into [`Record`] so callers never handle loosely-typed rows.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use crate::record::{Record, RecordUpdate};
use crate::{Error, Result};

/// Default row limit for searches
pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

const COLUMNS: &str = "equipment_id, equipment_type, issue, root_cause, \
     why1, why2, why3, why4, why5, solution, department, severity, date_reported, \
     shift_time, machine_age_bucket, maintenance_gap_days, failure_frequency, \
     environment, operating_load, recent_maintenance, source";

/// Fields with a distinct-value listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctField {
    RootCause,
    EquipmentType,
    Department,
}

impl DistinctField {
    fn column(self) -> &'static str {
        match self {
            DistinctField::RootCause => "root_cause",
            DistinctField::EquipmentType => "equipment_type",
            DistinctField::Department => "department",
        }
    }
}

/// Search filter; text filters are case-insensitive substring matches,
/// severity is an exact (lower-cased) match
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub equipment_type: Option<String>,
    pub department: Option<String>,
    pub severity: Option<String>,
    pub root_cause: Option<String>,
    pub limit: Option<i64>,
}

fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    record: &'q Record,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&record.equipment_type)
        .bind(&record.issue)
        .bind(&record.root_cause)
        .bind(&record.why1)
        .bind(&record.why2)
        .bind(&record.why3)
        .bind(&record.why4)
        .bind(&record.why5)
        .bind(&record.solution)
        .bind(&record.department)
        .bind(&record.severity)
        .bind(&record.date_reported)
        .bind(&record.shift_time)
        .bind(&record.machine_age_bucket)
        .bind(&record.maintenance_gap_days)
        .bind(&record.failure_frequency)
        .bind(&record.environment)
        .bind(&record.operating_load)
        .bind(&record.recent_maintenance)
        .bind(&record.source)
}

fn record_from_row(row: &SqliteRow) -> Result<Record> {
    Ok(Record {
        equipment_id: row.try_get("equipment_id")?,
        equipment_type: row.try_get("equipment_type")?,
        issue: row.try_get("issue")?,
        root_cause: row.try_get("root_cause")?,
        why1: row.try_get("why1")?,
        why2: row.try_get("why2")?,
        why3: row.try_get("why3")?,
        why4: row.try_get("why4")?,
        why5: row.try_get("why5")?,
        solution: row.try_get("solution")?,
        department: row.try_get("department")?,
        severity: row.try_get("severity")?,
        date_reported: row.try_get("date_reported")?,
        shift_time: row.try_get("shift_time")?,
        machine_age_bucket: row.try_get("machine_age_bucket")?,
        maintenance_gap_days: row.try_get("maintenance_gap_days")?,
        failure_frequency: row.try_get("failure_frequency")?,
        environment: row.try_get("environment")?,
        operating_load: row.try_get("operating_load")?,
        recent_maintenance: row.try_get("recent_maintenance")?,
        source: row.try_get("source")?,
    })
}

fn records_from_rows(rows: &[SqliteRow]) -> Result<Vec<Record>> {
    rows.iter().map(record_from_row).collect()
}

fn conflict_or_database(e: sqlx::Error, equipment_id: &str) -> Error {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return Error::Conflict(format!("Equipment ID {} already exists", equipment_id));
        }
    }
    Error::Database(e)
}

fn insert_sql() -> String {
    format!(
        "INSERT INTO equipment_records ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COLUMNS
    )
}

/// Escape LIKE wildcards and wrap the needle for substring matching
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Insert a new record; fails with `Conflict` when the id already exists
///
/// Every field is stored trimmed (see [`Record::normalized`]).
pub async fn insert_record(pool: &SqlitePool, record: &Record) -> Result<()> {
    let record = record.normalized();
    record.validate()?;

    let sql = insert_sql();
    bind_fields(sqlx::query(&sql).bind(&record.equipment_id), &record)
        .execute(pool)
        .await
        .map_err(|e| conflict_or_database(e, &record.equipment_id))?;

    debug!("Inserted record {}", record.equipment_id);
    Ok(())
}

/// Insert a batch of records in one transaction
///
/// All records are validated before anything is written; any failure rolls
/// the whole batch back.
pub async fn insert_records(pool: &SqlitePool, records: &[Record]) -> Result<u64> {
    let records: Vec<Record> = records.iter().map(Record::normalized).collect();
    for record in &records {
        record.validate()?;
    }

    let sql = insert_sql();
    let mut tx = pool.begin().await?;
    for record in &records {
        bind_fields(sqlx::query(&sql).bind(&record.equipment_id), record)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or_database(e, &record.equipment_id))?;
    }
    tx.commit().await?;

    Ok(records.len() as u64)
}

/// Replace the entire store contents with `records`
pub async fn replace_all_records(pool: &SqlitePool, records: &[Record]) -> Result<u64> {
    let records: Vec<Record> = records.iter().map(Record::normalized).collect();
    for record in &records {
        record.validate()?;
    }

    let sql = insert_sql();
    let mut tx = pool.begin().await?;
    let cleared = sqlx::query("DELETE FROM equipment_records")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    debug!("Cleared {} existing records", cleared);

    for record in &records {
        bind_fields(sqlx::query(&sql).bind(&record.equipment_id), record)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or_database(e, &record.equipment_id))?;
    }
    tx.commit().await?;

    Ok(records.len() as u64)
}

/// Load a record by its equipment id
pub async fn find_record(pool: &SqlitePool, equipment_id: &str) -> Result<Option<Record>> {
    let sql = format!("SELECT {} FROM equipment_records WHERE equipment_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(equipment_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Apply a partial update; fails with `NotFound` when the id is unknown
///
/// The read and the write share one transaction.
pub async fn update_record(
    pool: &SqlitePool,
    equipment_id: &str,
    update: RecordUpdate,
) -> Result<Record> {
    if update.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }

    let mut tx = pool.begin().await?;
    let sql = format!("SELECT {} FROM equipment_records WHERE equipment_id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(equipment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Record {}", equipment_id)))?;

    let mut record = record_from_row(&row)?;
    record.apply(update);
    let record = record.normalized();
    record.validate()?;

    let query = sqlx::query(
        r#"
        UPDATE equipment_records SET
            equipment_type = ?, issue = ?, root_cause = ?,
            why1 = ?, why2 = ?, why3 = ?, why4 = ?, why5 = ?,
            solution = ?, department = ?, severity = ?, date_reported = ?,
            shift_time = ?, machine_age_bucket = ?, maintenance_gap_days = ?,
            failure_frequency = ?, environment = ?, operating_load = ?,
            recent_maintenance = ?, source = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE equipment_id = ?
        "#,
    );
    let updated = bind_fields(query, &record)
        .bind(equipment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(Error::NotFound(format!("Record {}", equipment_id)));
    }
    tx.commit().await?;

    debug!("Updated record {}", record.equipment_id);
    Ok(record)
}

/// Delete a record; fails with `NotFound` when the id is unknown
pub async fn delete_record(pool: &SqlitePool, equipment_id: &str) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM equipment_records WHERE equipment_id = ?")
        .bind(equipment_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("Record {}", equipment_id)));
    }
    Ok(())
}

/// Every record, ordered by equipment id
pub async fn find_all_records(pool: &SqlitePool) -> Result<Vec<Record>> {
    let sql = format!("SELECT {} FROM equipment_records ORDER BY equipment_id", COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    records_from_rows(&rows)
}

/// Records labelled with `root_cause`, used to backfill 5-why content
pub async fn find_records_by_label(
    pool: &SqlitePool,
    root_cause: &str,
    limit: i64,
) -> Result<Vec<Record>> {
    let sql = format!(
        "SELECT {} FROM equipment_records WHERE root_cause = ? ORDER BY equipment_id LIMIT ?",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(root_cause)
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
    records_from_rows(&rows)
}

/// Field-filtered search
pub async fn search_records(pool: &SqlitePool, filter: &RecordFilter) -> Result<Vec<Record>> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM equipment_records WHERE 1 = 1",
        COLUMNS
    ));

    if let Some(value) = present(&filter.equipment_type) {
        qb.push(" AND equipment_type LIKE ")
            .push_bind(like_pattern(value))
            .push(" ESCAPE '\\'");
    }
    if let Some(value) = present(&filter.department) {
        qb.push(" AND department LIKE ")
            .push_bind(like_pattern(value))
            .push(" ESCAPE '\\'");
    }
    if let Some(value) = present(&filter.severity) {
        qb.push(" AND lower(severity) = ")
            .push_bind(value.trim().to_lowercase());
    }
    if let Some(value) = present(&filter.root_cause) {
        qb.push(" AND root_cause LIKE ")
            .push_bind(like_pattern(value))
            .push(" ESCAPE '\\'");
    }

    let limit = filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).max(0);
    qb.push(" ORDER BY equipment_id LIMIT ").push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    records_from_rows(&rows)
}

/// Sorted distinct non-empty values of a field
pub async fn distinct_values(pool: &SqlitePool, field: DistinctField) -> Result<Vec<String>> {
    let column = field.column();
    let sql = format!(
        "SELECT DISTINCT {col} FROM equipment_records WHERE {col} <> '' ORDER BY {col}",
        col = column
    );
    let values = sqlx::query_scalar::<_, String>(&sql).fetch_all(pool).await?;
    Ok(values)
}

/// Number of stored records
pub async fn count_records(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM equipment_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
