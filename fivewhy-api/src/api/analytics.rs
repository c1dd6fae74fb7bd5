//! Analytics endpoints (frequency tables only)

use axum::{extract::State, routing::get, Json, Router};
use fivewhy_common::db;
use serde::Serialize;

use crate::analytics::{self, Counts, CrossTable, Summary};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub monthly_trends: Counts,
}

#[derive(Debug, Serialize)]
pub struct DepartmentStatsResponse {
    /// severity -> department -> count
    pub department_stats: CrossTable,
}

#[derive(Debug, Serialize)]
pub struct RootCauseStatsResponse {
    /// equipment type -> root cause -> count
    pub root_cause_stats: CrossTable,
}

/// GET /analytics/summary
pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<Summary>> {
    let records = db::find_all_records(&state.db).await?;
    Ok(Json(analytics::summary(&records)))
}

/// GET /analytics/trends
pub async fn trends(State(state): State<AppState>) -> ApiResult<Json<TrendsResponse>> {
    let records = db::find_all_records(&state.db).await?;
    Ok(Json(TrendsResponse {
        monthly_trends: analytics::monthly_trends(&records),
    }))
}

/// GET /analytics/department-stats
pub async fn department_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<DepartmentStatsResponse>> {
    let records = db::find_all_records(&state.db).await?;
    Ok(Json(DepartmentStatsResponse {
        department_stats: analytics::department_stats(&records),
    }))
}

/// GET /analytics/root-cause-stats
pub async fn root_cause_stats(
    State(state): State<AppState>,
) -> ApiResult<Json<RootCauseStatsResponse>> {
    let records = db::find_all_records(&state.db).await?;
    Ok(Json(RootCauseStatsResponse {
        root_cause_stats: analytics::root_cause_stats(&records),
    }))
}

pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/summary", get(summary))
        .route("/analytics/trends", get(trends))
        .route("/analytics/department-stats", get(department_stats))
        .route("/analytics/root-cause-stats", get(root_cause_stats))
}
