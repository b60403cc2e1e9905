//! GRADE assessment endpoints: fetch per extraction, override a domain.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::grade::{self, GradeOverride};
use crate::models::enums::DomainRating;
use crate::models::{GradeAssessment, GradeDomainKey};

/// `GET /api/extractions/:id/grade` — assessments for an extraction,
/// ordered by outcome name.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(extraction_id): Path<Uuid>,
) -> Result<Json<Vec<GradeAssessment>>, ApiError> {
    let conn = ctx.lock_db()?;
    let assessments = repository::list_grade_assessments(&conn, extraction_id)?;
    Ok(Json(assessments))
}

#[derive(Deserialize)]
pub struct GradeOverrideBody {
    pub domain: GradeDomainKey,
    pub new_rating: DomainRating,
    pub reason: String,
    pub overridden_by: Uuid,
}

/// `PUT /api/grade-assessments/:id` — override one domain rating.
///
/// The rating and reason are validated here and revalidated in the core;
/// `overall_certainty` is left as produced.
pub async fn override_domain(
    State(ctx): State<ApiContext>,
    Path(assessment_id): Path<Uuid>,
    Json(body): Json<GradeOverrideBody>,
) -> Result<Json<GradeAssessment>, ApiError> {
    if body.reason.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Override reason must not be empty".into(),
        ));
    }
    let conn = ctx.lock_db()?;
    let assessment = grade::override_domain(
        &conn,
        assessment_id,
        &GradeOverride {
            domain: body.domain,
            new_rating: body.new_rating,
            reason: body.reason,
            overridden_by: body.overridden_by,
        },
    )?;
    Ok(Json(assessment))
}
