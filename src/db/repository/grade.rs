use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::CertaintyLevel;
use crate::models::{GradeAssessment, GradeDomain, UpgradeFactor};

use super::{json_col_opt, parse_json_opt, parse_uuid, parse_uuid_opt};

const GRADE_COLUMNS: &str = "id, extraction_id, outcome_name,
     risk_of_bias, inconsistency, indirectness, imprecision, publication_bias,
     large_effect, dose_response, residual_confounding,
     overall_certainty, overall_rationale,
     is_overridden, overridden_by, override_reason, created_at, updated_at";

pub fn insert_grade_assessment(
    conn: &Connection,
    assessment: &GradeAssessment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO grade_assessments (id, extraction_id, outcome_name,
         risk_of_bias, inconsistency, indirectness, imprecision, publication_bias,
         large_effect, dose_response, residual_confounding,
         overall_certainty, overall_rationale,
         is_overridden, overridden_by, override_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            assessment.id.to_string(),
            assessment.extraction_id.to_string(),
            assessment.outcome_name,
            json_col_opt(&assessment.risk_of_bias)?,
            json_col_opt(&assessment.inconsistency)?,
            json_col_opt(&assessment.indirectness)?,
            json_col_opt(&assessment.imprecision)?,
            json_col_opt(&assessment.publication_bias)?,
            json_col_opt(&assessment.large_effect)?,
            json_col_opt(&assessment.dose_response)?,
            json_col_opt(&assessment.residual_confounding)?,
            assessment.overall_certainty.map(|c| c.as_str()),
            assessment.overall_rationale,
            assessment.is_overridden,
            assessment.overridden_by.map(|id| id.to_string()),
            assessment.override_reason,
            assessment.created_at,
            assessment.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_grade_assessment(
    conn: &Connection,
    id: Uuid,
) -> Result<GradeAssessment, DatabaseError> {
    let sql = format!("SELECT {GRADE_COLUMNS} FROM grade_assessments WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| {
            Ok(grade_row_from_rusqlite(row))
        })
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "grade_assessment".into(),
            id: id.to_string(),
        })??;

    grade_from_row(row)
}

/// All assessments for an extraction, ordered by outcome name.
pub fn list_grade_assessments(
    conn: &Connection,
    extraction_id: Uuid,
) -> Result<Vec<GradeAssessment>, DatabaseError> {
    let sql = format!(
        "SELECT {GRADE_COLUMNS} FROM grade_assessments
         WHERE extraction_id = ?1 ORDER BY outcome_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![extraction_id.to_string()], |row| {
        Ok(grade_row_from_rusqlite(row))
    })?;

    let mut assessments = Vec::new();
    for row in rows {
        assessments.push(grade_from_row(row??)?);
    }
    Ok(assessments)
}

/// Persist an assessment after a domain override.
pub fn update_grade_assessment(
    conn: &Connection,
    assessment: &GradeAssessment,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE grade_assessments SET
         risk_of_bias = ?1, inconsistency = ?2, indirectness = ?3,
         imprecision = ?4, publication_bias = ?5,
         large_effect = ?6, dose_response = ?7, residual_confounding = ?8,
         overall_certainty = ?9, overall_rationale = ?10,
         is_overridden = ?11, overridden_by = ?12, override_reason = ?13,
         updated_at = ?14
         WHERE id = ?15",
        params![
            json_col_opt(&assessment.risk_of_bias)?,
            json_col_opt(&assessment.inconsistency)?,
            json_col_opt(&assessment.indirectness)?,
            json_col_opt(&assessment.imprecision)?,
            json_col_opt(&assessment.publication_bias)?,
            json_col_opt(&assessment.large_effect)?,
            json_col_opt(&assessment.dose_response)?,
            json_col_opt(&assessment.residual_confounding)?,
            assessment.overall_certainty.map(|c| c.as_str()),
            assessment.overall_rationale,
            assessment.is_overridden,
            assessment.overridden_by.map(|id| id.to_string()),
            assessment.override_reason,
            assessment.updated_at,
            assessment.id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "grade_assessment".into(),
            id: assessment.id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for GradeAssessment mapping
struct GradeRow {
    id: String,
    extraction_id: String,
    outcome_name: String,
    risk_of_bias: Option<String>,
    inconsistency: Option<String>,
    indirectness: Option<String>,
    imprecision: Option<String>,
    publication_bias: Option<String>,
    large_effect: Option<String>,
    dose_response: Option<String>,
    residual_confounding: Option<String>,
    overall_certainty: Option<String>,
    overall_rationale: Option<String>,
    is_overridden: bool,
    overridden_by: Option<String>,
    override_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn grade_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<GradeRow, rusqlite::Error> {
    Ok(GradeRow {
        id: row.get(0)?,
        extraction_id: row.get(1)?,
        outcome_name: row.get(2)?,
        risk_of_bias: row.get(3)?,
        inconsistency: row.get(4)?,
        indirectness: row.get(5)?,
        imprecision: row.get(6)?,
        publication_bias: row.get(7)?,
        large_effect: row.get(8)?,
        dose_response: row.get(9)?,
        residual_confounding: row.get(10)?,
        overall_certainty: row.get(11)?,
        overall_rationale: row.get(12)?,
        is_overridden: row.get(13)?,
        overridden_by: row.get(14)?,
        override_reason: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn grade_from_row(row: GradeRow) -> Result<GradeAssessment, DatabaseError> {
    let overall_certainty = row
        .overall_certainty
        .as_deref()
        .map(CertaintyLevel::from_str)
        .transpose()?;

    Ok(GradeAssessment {
        id: parse_uuid("grade_assessments.id", &row.id)?,
        extraction_id: parse_uuid("grade_assessments.extraction_id", &row.extraction_id)?,
        outcome_name: row.outcome_name,
        risk_of_bias: parse_json_opt::<GradeDomain>(
            "grade_assessments.risk_of_bias",
            row.risk_of_bias,
        )?,
        inconsistency: parse_json_opt::<GradeDomain>(
            "grade_assessments.inconsistency",
            row.inconsistency,
        )?,
        indirectness: parse_json_opt::<GradeDomain>(
            "grade_assessments.indirectness",
            row.indirectness,
        )?,
        imprecision: parse_json_opt::<GradeDomain>(
            "grade_assessments.imprecision",
            row.imprecision,
        )?,
        publication_bias: parse_json_opt::<GradeDomain>(
            "grade_assessments.publication_bias",
            row.publication_bias,
        )?,
        large_effect: parse_json_opt::<UpgradeFactor>(
            "grade_assessments.large_effect",
            row.large_effect,
        )?,
        dose_response: parse_json_opt::<UpgradeFactor>(
            "grade_assessments.dose_response",
            row.dose_response,
        )?,
        residual_confounding: parse_json_opt::<UpgradeFactor>(
            "grade_assessments.residual_confounding",
            row.residual_confounding,
        )?,
        overall_certainty,
        overall_rationale: row.overall_rationale,
        is_overridden: row.is_overridden,
        overridden_by: parse_uuid_opt("grade_assessments.overridden_by", row.overridden_by)?,
        override_reason: row.override_reason,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
