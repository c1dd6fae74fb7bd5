//! Search and distinct-value listings

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use fivewhy_common::db::{self, DistinctField, RecordFilter};
use serde::{Deserialize, Serialize};

use crate::api::records::RecordList;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for GET /search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub equipment_type: Option<String>,
    pub department: Option<String>,
    pub severity: Option<String>,
    pub root_cause: Option<String>,
    pub limit: Option<i64>,
}

/// GET /search
///
/// Text filters match case-insensitive substrings; severity matches exactly.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<RecordList>> {
    if query.limit.is_some_and(|limit| limit < 0) {
        return Err(ApiError::BadRequest("limit must not be negative".to_string()));
    }

    let filter = RecordFilter {
        equipment_type: query.equipment_type,
        department: query.department,
        severity: query.severity,
        root_cause: query.root_cause,
        limit: query.limit,
    };
    let records = db::search_records(&state.db, &filter).await?;
    Ok(Json(records.into()))
}

#[derive(Debug, Serialize)]
pub struct RootCauses {
    pub root_causes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EquipmentTypes {
    pub equipment_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Departments {
    pub departments: Vec<String>,
}

/// GET /root-causes
pub async fn root_causes(State(state): State<AppState>) -> ApiResult<Json<RootCauses>> {
    let root_causes = db::distinct_values(&state.db, DistinctField::RootCause).await?;
    Ok(Json(RootCauses { root_causes }))
}

/// GET /equipment-types
pub async fn equipment_types(State(state): State<AppState>) -> ApiResult<Json<EquipmentTypes>> {
    let equipment_types = db::distinct_values(&state.db, DistinctField::EquipmentType).await?;
    Ok(Json(EquipmentTypes { equipment_types }))
}

/// GET /departments
pub async fn departments(State(state): State<AppState>) -> ApiResult<Json<Departments>> {
    let departments = db::distinct_values(&state.db, DistinctField::Department).await?;
    Ok(Json(Departments { departments }))
}

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/root-causes", get(root_causes))
        .route("/equipment-types", get(equipment_types))
        .route("/departments", get(departments))
}
