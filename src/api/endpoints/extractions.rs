//! Extraction endpoints: trigger a round, fetch versions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::ingest;
use crate::models::ExtractionRecord;

#[derive(Deserialize, Default)]
pub struct ExtractionTrigger {
    pub extraction_template_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// `POST /api/articles/:id/extract` — run extraction and persist the next
/// version for this article.
pub async fn trigger(
    State(ctx): State<ApiContext>,
    Path(article_id): Path<Uuid>,
    body: Option<Json<ExtractionTrigger>>,
) -> Result<(StatusCode, Json<ExtractionRecord>), ApiError> {
    let Json(body) = body.unwrap_or_default();
    let conn = ctx.lock_db()?;
    let record = ingest::ingest_extraction(
        &conn,
        ctx.producer.as_ref(),
        article_id,
        body.user_id,
        body.extraction_template_id,
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/extractions/:id` — one extraction version.
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    let conn = ctx.lock_db()?;
    let record = repository::get_extraction(&conn, id)?;
    Ok(Json(record))
}

/// `PUT /api/extractions/:id` — apply a sections payload as the article's
/// next version.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(updates): Json<serde_json::Value>,
) -> Result<Json<ExtractionRecord>, ApiError> {
    if !updates.is_object() {
        return Err(ApiError::BadRequest(
            "Expected an object keyed by section name".into(),
        ));
    }
    let conn = ctx.lock_db()?;
    let record = ingest::revise_extraction(&conn, id, &updates)?;
    Ok(Json(record))
}

/// `GET /api/articles/:id/extractions` — all versions, newest first.
pub async fn list_for_article(
    State(ctx): State<ApiContext>,
    Path(article_id): Path<Uuid>,
) -> Result<Json<Vec<ExtractionRecord>>, ApiError> {
    let conn = ctx.lock_db()?;
    let records = repository::list_extractions_for_article(&conn, article_id)?;
    Ok(Json(records))
}
