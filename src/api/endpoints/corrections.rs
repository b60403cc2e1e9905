//! Correction endpoints.
//!
//! Submitting a correction appends the ledger entry and applies it as the
//! article's next extraction version in one step, so a client that submits
//! and reloads always sees its effect.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::corrections::{self, NewCorrection};
use crate::models::{Correction, ValueEnvelope};

#[derive(Deserialize)]
pub struct CorrectionCreate {
    pub user_id: Uuid,
    pub field_path: String,
    pub original_value: Option<ValueEnvelope>,
    pub corrected_value: Option<ValueEnvelope>,
    pub correction_type: Option<String>,
    pub rationale: Option<String>,
}

#[derive(Serialize)]
pub struct CorrectionSubmitResult {
    pub correction: Correction,
    /// Extraction version created by applying the correction.
    pub new_extraction_id: Uuid,
    pub new_version: i64,
}

/// `POST /api/extractions/:id/corrections` — record and apply a correction.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
    Json(body): Json<CorrectionCreate>,
) -> Result<(StatusCode, Json<CorrectionSubmitResult>), ApiError> {
    let conn = ctx.lock_db()?;
    let correction = corrections::submit_correction(
        &conn,
        NewCorrection {
            extraction_id,
            user_id: body.user_id,
            field_path: body.field_path,
            original_value: body.original_value,
            corrected_value: body.corrected_value,
            correction_type: body.correction_type,
            rationale: body.rationale,
        },
    )?;
    let next = corrections::apply_correction(&conn, &correction)?;

    Ok((
        StatusCode::CREATED,
        Json(CorrectionSubmitResult {
            correction,
            new_extraction_id: next.id,
            new_version: next.version,
        }),
    ))
}

#[derive(Deserialize, Default)]
pub struct CorrectionsQuery {
    /// Restrict the history to one field path.
    pub field_path: Option<String>,
}

/// `GET /api/extractions/:id/corrections` — ledger entries, oldest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
    Query(query): Query<CorrectionsQuery>,
) -> Result<Json<Vec<Correction>>, ApiError> {
    let conn = ctx.lock_db()?;
    let entries = match query.field_path.as_deref() {
        Some(field_path) => corrections::corrections_for(&conn, extraction_id, field_path)?,
        None => corrections::list_corrections(&conn, extraction_id)?,
    };
    Ok(Json(entries))
}
