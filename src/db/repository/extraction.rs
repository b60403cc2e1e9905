use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::ExtractionStatus;
use crate::models::{
    CompletenessSummary, ExtractionRecord, FieldNode, ReviewStatus, ValidationWarning,
};

use super::{json_col, json_col_opt, parse_json_opt, parse_uuid, parse_uuid_opt};

const EXTRACTION_COLUMNS: &str = "id, article_id, extracted_by, template_id, version, status,
     study_design, population, intervention, comparator, outcomes,
     setting, follow_up, funding, limitations, conclusions,
     custom_fields, completeness_summary, validation_warnings,
     field_review_status, synthesis, raw_llm_response,
     prompt_tokens, completion_tokens, model_used, created_at, updated_at";

pub fn insert_extraction(conn: &Connection, record: &ExtractionRecord) -> Result<(), DatabaseError> {
    let warnings = if record.validation_warnings.is_empty() {
        None
    } else {
        Some(json_col(&record.validation_warnings)?)
    };
    conn.execute(
        "INSERT INTO extractions (id, article_id, extracted_by, template_id, version, status,
         study_design, population, intervention, comparator, outcomes,
         setting, follow_up, funding, limitations, conclusions,
         custom_fields, completeness_summary, validation_warnings,
         field_review_status, synthesis, raw_llm_response,
         prompt_tokens, completion_tokens, model_used, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
        params![
            record.id.to_string(),
            record.article_id.to_string(),
            record.extracted_by.map(|id| id.to_string()),
            record.template_id.map(|id| id.to_string()),
            record.version,
            record.status.as_str(),
            json_col_opt(&record.study_design)?,
            json_col_opt(&record.population)?,
            json_col_opt(&record.intervention)?,
            json_col_opt(&record.comparator)?,
            json_col_opt(&record.outcomes)?,
            json_col_opt(&record.setting)?,
            json_col_opt(&record.follow_up)?,
            json_col_opt(&record.funding)?,
            json_col_opt(&record.limitations)?,
            json_col_opt(&record.conclusions)?,
            json_col_opt(&record.custom_fields)?,
            json_col_opt(&record.completeness_summary)?,
            warnings,
            json_col(&record.field_review_status)?,
            json_col_opt(&record.synthesis)?,
            json_col_opt(&record.raw_llm_response)?,
            record.prompt_tokens,
            record.completion_tokens,
            record.model_used,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_extraction(conn: &Connection, id: Uuid) -> Result<ExtractionRecord, DatabaseError> {
    let sql = format!("SELECT {EXTRACTION_COLUMNS} FROM extractions WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], |row| {
            Ok(extraction_row_from_rusqlite(row))
        })
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "extraction".into(),
            id: id.to_string(),
        })??;

    extraction_from_row(row)
}

/// All extraction versions for an article, newest version first.
pub fn list_extractions_for_article(
    conn: &Connection,
    article_id: Uuid,
) -> Result<Vec<ExtractionRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {EXTRACTION_COLUMNS} FROM extractions
         WHERE article_id = ?1 ORDER BY version DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![article_id.to_string()], |row| {
        Ok(extraction_row_from_rusqlite(row))
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(extraction_from_row(row??)?);
    }
    Ok(records)
}

/// Latest extraction version for an article, if any.
pub fn latest_extraction_for_article(
    conn: &Connection,
    article_id: Uuid,
) -> Result<Option<ExtractionRecord>, DatabaseError> {
    Ok(list_extractions_for_article(conn, article_id)?.into_iter().next())
}

pub fn count_extractions_for_article(
    conn: &Connection,
    article_id: Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM extractions WHERE article_id = ?1",
        params![article_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Persist the sparse review-status map of the current version.
/// Last write wins; concurrent reviewer edits are not merged here.
pub fn update_field_review_status(
    conn: &Connection,
    extraction_id: Uuid,
    status_map: &BTreeMap<String, ReviewStatus>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE extractions SET field_review_status = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            json_col(status_map)?,
            Utc::now(),
            extraction_id.to_string()
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "extraction".into(),
            id: extraction_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for ExtractionRecord mapping
struct ExtractionRow {
    id: String,
    article_id: String,
    extracted_by: Option<String>,
    template_id: Option<String>,
    version: i64,
    status: String,
    study_design: Option<String>,
    population: Option<String>,
    intervention: Option<String>,
    comparator: Option<String>,
    outcomes: Option<String>,
    setting: Option<String>,
    follow_up: Option<String>,
    funding: Option<String>,
    limitations: Option<String>,
    conclusions: Option<String>,
    custom_fields: Option<String>,
    completeness_summary: Option<String>,
    validation_warnings: Option<String>,
    field_review_status: Option<String>,
    synthesis: Option<String>,
    raw_llm_response: Option<String>,
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    model_used: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn extraction_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ExtractionRow, rusqlite::Error> {
    Ok(ExtractionRow {
        id: row.get(0)?,
        article_id: row.get(1)?,
        extracted_by: row.get(2)?,
        template_id: row.get(3)?,
        version: row.get(4)?,
        status: row.get(5)?,
        study_design: row.get(6)?,
        population: row.get(7)?,
        intervention: row.get(8)?,
        comparator: row.get(9)?,
        outcomes: row.get(10)?,
        setting: row.get(11)?,
        follow_up: row.get(12)?,
        funding: row.get(13)?,
        limitations: row.get(14)?,
        conclusions: row.get(15)?,
        custom_fields: row.get(16)?,
        completeness_summary: row.get(17)?,
        validation_warnings: row.get(18)?,
        field_review_status: row.get(19)?,
        synthesis: row.get(20)?,
        raw_llm_response: row.get(21)?,
        prompt_tokens: row.get(22)?,
        completion_tokens: row.get(23)?,
        model_used: row.get(24)?,
        created_at: row.get(25)?,
        updated_at: row.get(26)?,
    })
}

fn extraction_from_row(row: ExtractionRow) -> Result<ExtractionRecord, DatabaseError> {
    let warnings: Option<Vec<ValidationWarning>> =
        parse_json_opt("extractions.validation_warnings", row.validation_warnings)?;
    let review: Option<BTreeMap<String, ReviewStatus>> =
        parse_json_opt("extractions.field_review_status", row.field_review_status)?;

    Ok(ExtractionRecord {
        id: parse_uuid("extractions.id", &row.id)?,
        article_id: parse_uuid("extractions.article_id", &row.article_id)?,
        extracted_by: parse_uuid_opt("extractions.extracted_by", row.extracted_by)?,
        template_id: parse_uuid_opt("extractions.template_id", row.template_id)?,
        version: row.version,
        status: ExtractionStatus::from_str(&row.status)?,
        study_design: parse_json_opt::<FieldNode>("extractions.study_design", row.study_design)?,
        population: parse_json_opt::<FieldNode>("extractions.population", row.population)?,
        intervention: parse_json_opt::<FieldNode>("extractions.intervention", row.intervention)?,
        comparator: parse_json_opt::<FieldNode>("extractions.comparator", row.comparator)?,
        outcomes: parse_json_opt::<FieldNode>("extractions.outcomes", row.outcomes)?,
        setting: parse_json_opt::<FieldNode>("extractions.setting", row.setting)?,
        follow_up: parse_json_opt::<FieldNode>("extractions.follow_up", row.follow_up)?,
        funding: parse_json_opt::<FieldNode>("extractions.funding", row.funding)?,
        limitations: parse_json_opt::<FieldNode>("extractions.limitations", row.limitations)?,
        conclusions: parse_json_opt::<FieldNode>("extractions.conclusions", row.conclusions)?,
        custom_fields: parse_json_opt::<FieldNode>("extractions.custom_fields", row.custom_fields)?,
        completeness_summary: parse_json_opt::<CompletenessSummary>(
            "extractions.completeness_summary",
            row.completeness_summary,
        )?,
        validation_warnings: warnings.unwrap_or_default(),
        field_review_status: review.unwrap_or_default(),
        synthesis: parse_json_opt::<Value>("extractions.synthesis", row.synthesis)?,
        raw_llm_response: parse_json_opt::<Value>(
            "extractions.raw_llm_response",
            row.raw_llm_response,
        )?,
        prompt_tokens: row.prompt_tokens,
        completion_tokens: row.completion_tokens,
        model_used: row.model_used,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
