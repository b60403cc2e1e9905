//! Review-status endpoints: explicit set, cycle, progress.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::enums::ReviewState;
use crate::models::ReviewStatus;
use crate::review::{self, ReviewProgress};

#[derive(Deserialize)]
pub struct ReviewStatusUpdate {
    pub field_path: String,
    pub status: ReviewState,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ReviewStatusResult {
    pub field_path: String,
    #[serde(flatten)]
    pub status: ReviewStatus,
}

/// `PUT /api/extractions/:id/review-status` — set one field's state.
pub async fn set(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
    Json(body): Json<ReviewStatusUpdate>,
) -> Result<Json<ReviewStatusResult>, ApiError> {
    let conn = ctx.lock_db()?;
    let status = review::set_review_status(
        &conn,
        extraction_id,
        &body.field_path,
        body.status,
        body.reviewed_by,
    )?;
    Ok(Json(ReviewStatusResult {
        field_path: body.field_path,
        status,
    }))
}

#[derive(Deserialize)]
pub struct ReviewCycleRequest {
    pub field_path: String,
    pub reviewed_by: Option<Uuid>,
}

/// `POST /api/extractions/:id/review-status/cycle` — advance one field to
/// the next state in the review cycle.
pub async fn cycle(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
    Json(body): Json<ReviewCycleRequest>,
) -> Result<Json<ReviewStatusResult>, ApiError> {
    let conn = ctx.lock_db()?;
    let status = review::cycle_review_status(
        &conn,
        extraction_id,
        &body.field_path,
        body.reviewed_by,
    )?;
    Ok(Json(ReviewStatusResult {
        field_path: body.field_path,
        status,
    }))
}

/// `GET /api/extractions/:id/review-progress` — counts per review state.
pub async fn progress(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
) -> Result<Json<ReviewProgress>, ApiError> {
    let conn = ctx.lock_db()?;
    let record = repository::get_extraction(&conn, extraction_id)?;
    Ok(Json(review::review_progress(&record)))
}
