//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates the record table.
//! Schema creation is idempotent and runs on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open or create the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL allows readers while the importer writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_records_table(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection that never expires: every new SQLite
/// connection to `:memory:` would otherwise see an empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_records_table(&pool).await?;

    Ok(pool)
}

async fn create_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS equipment_records (
            equipment_id TEXT PRIMARY KEY NOT NULL,
            equipment_type TEXT NOT NULL DEFAULT '',
            issue TEXT NOT NULL DEFAULT '',
            root_cause TEXT NOT NULL,
            why1 TEXT NOT NULL DEFAULT '',
            why2 TEXT NOT NULL DEFAULT '',
            why3 TEXT NOT NULL DEFAULT '',
            why4 TEXT NOT NULL DEFAULT '',
            why5 TEXT NOT NULL DEFAULT '',
            solution TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            severity TEXT NOT NULL DEFAULT '',
            date_reported TEXT NOT NULL DEFAULT '',
            shift_time TEXT,
            machine_age_bucket TEXT,
            maintenance_gap_days TEXT,
            failure_frequency TEXT,
            environment TEXT,
            operating_load TEXT,
            recent_maintenance TEXT,
            source TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_equipment_records_root_cause ON equipment_records(root_cause)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cheap connectivity probe used by health checks
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .is_ok()
}
