//! Record CRUD endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use fivewhy_common::{db, Record, RecordUpdate};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Record listing
#[derive(Debug, Serialize)]
pub struct RecordList {
    pub data: Vec<Record>,
    pub count: usize,
}

impl From<Vec<Record>> for RecordList {
    fn from(data: Vec<Record>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            id: None,
        }
    }
}

/// GET /all-data
pub async fn all_records(State(state): State<AppState>) -> ApiResult<Json<RecordList>> {
    let records = db::find_all_records(&state.db).await?;
    Ok(Json(records.into()))
}

/// GET /record/:equipment_id
pub async fn get_record(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> ApiResult<Json<Record>> {
    db::find_record(&state.db, &equipment_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))
}

/// POST /add-record
///
/// Duplicate equipment ids are rejected with 409.
pub async fn add_record(
    State(state): State<AppState>,
    Json(record): Json<Record>,
) -> ApiResult<Json<MessageResponse>> {
    db::insert_record(&state.db, &record).await?;
    info!("Added record {}", record.equipment_id);

    Ok(Json(MessageResponse {
        id: Some(record.equipment_id),
        ..MessageResponse::new("Record added successfully")
    }))
}

/// PUT /update-record/:equipment_id
pub async fn update_record(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    Json(update): Json<RecordUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    db::update_record(&state.db, &equipment_id, update).await?;
    info!("Updated record {}", equipment_id);
    Ok(Json(MessageResponse::new("Record updated successfully")))
}

/// DELETE /delete-record/:equipment_id
pub async fn delete_record(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    db::delete_record(&state.db, &equipment_id).await?;
    info!("Deleted record {}", equipment_id);
    Ok(Json(MessageResponse::new("Record deleted successfully")))
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/all-data", get(all_records))
        .route("/record/:equipment_id", get(get_record))
        .route("/add-record", post(add_record))
        .route("/update-record/:equipment_id", put(update_record))
        .route("/delete-record/:equipment_id", delete(delete_record))
}
