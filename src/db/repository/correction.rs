use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Correction, ValueEnvelope};

use super::{json_col, json_col_opt, parse_json, parse_json_opt, parse_uuid};

const CORRECTION_COLUMNS: &str = "id, extraction_id, user_id, field_path, original_value,
     corrected_value, correction_type, rationale, applied_to_training, created_at";

pub fn insert_correction(conn: &Connection, correction: &Correction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO corrections (id, extraction_id, user_id, field_path, original_value,
         corrected_value, correction_type, rationale, applied_to_training, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            correction.id.to_string(),
            correction.extraction_id.to_string(),
            correction.user_id.to_string(),
            correction.field_path,
            json_col_opt(&correction.original_value)?,
            json_col(&correction.corrected_value)?,
            correction.correction_type,
            correction.rationale,
            correction.applied_to_training,
            correction.created_at,
        ],
    )?;
    Ok(())
}

/// All corrections for an extraction, oldest first, so a history view can
/// show original→corrected chains chronologically.
pub fn list_corrections(
    conn: &Connection,
    extraction_id: Uuid,
) -> Result<Vec<Correction>, DatabaseError> {
    let sql = format!(
        "SELECT {CORRECTION_COLUMNS} FROM corrections
         WHERE extraction_id = ?1 ORDER BY created_at ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![extraction_id.to_string()], |row| {
        Ok(correction_row_from_rusqlite(row))
    })?;

    let mut corrections = Vec::new();
    for row in rows {
        corrections.push(correction_from_row(row??)?);
    }
    Ok(corrections)
}

/// Corrections for one field path of an extraction, oldest first.
pub fn corrections_for_field(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
) -> Result<Vec<Correction>, DatabaseError> {
    let sql = format!(
        "SELECT {CORRECTION_COLUMNS} FROM corrections
         WHERE extraction_id = ?1 AND field_path = ?2 ORDER BY created_at ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![extraction_id.to_string(), field_path], |row| {
        Ok(correction_row_from_rusqlite(row))
    })?;

    let mut corrections = Vec::new();
    for row in rows {
        corrections.push(correction_from_row(row??)?);
    }
    Ok(corrections)
}

/// Whether any correction was ever recorded for this field.
/// Display-only flag; aggregation never consults it.
pub fn has_correction_history(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM corrections WHERE extraction_id = ?1 AND field_path = ?2)",
        params![extraction_id.to_string(), field_path],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

/// Distinct field paths with at least one correction, for badge rendering.
pub fn corrected_field_paths(
    conn: &Connection,
    extraction_id: Uuid,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT field_path FROM corrections WHERE extraction_id = ?1 ORDER BY field_path",
    )?;
    let rows = stmt.query_map(params![extraction_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut paths = Vec::new();
    for row in rows {
        paths.push(row?);
    }
    Ok(paths)
}

pub fn mark_applied_to_training(
    conn: &Connection,
    correction_id: Uuid,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE corrections SET applied_to_training = 1 WHERE id = ?1",
        params![correction_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "correction".into(),
            id: correction_id.to_string(),
        });
    }
    Ok(())
}

// Internal row type for Correction mapping
struct CorrectionRow {
    id: String,
    extraction_id: String,
    user_id: String,
    field_path: String,
    original_value: Option<String>,
    corrected_value: String,
    correction_type: Option<String>,
    rationale: Option<String>,
    applied_to_training: bool,
    created_at: DateTime<Utc>,
}

fn correction_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<CorrectionRow, rusqlite::Error> {
    Ok(CorrectionRow {
        id: row.get(0)?,
        extraction_id: row.get(1)?,
        user_id: row.get(2)?,
        field_path: row.get(3)?,
        original_value: row.get(4)?,
        corrected_value: row.get(5)?,
        correction_type: row.get(6)?,
        rationale: row.get(7)?,
        applied_to_training: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn correction_from_row(row: CorrectionRow) -> Result<Correction, DatabaseError> {
    Ok(Correction {
        id: parse_uuid("corrections.id", &row.id)?,
        extraction_id: parse_uuid("corrections.extraction_id", &row.extraction_id)?,
        user_id: parse_uuid("corrections.user_id", &row.user_id)?,
        field_path: row.field_path,
        original_value: parse_json_opt::<ValueEnvelope>(
            "corrections.original_value",
            row.original_value,
        )?,
        corrected_value: parse_json::<ValueEnvelope>(
            "corrections.corrected_value",
            &row.corrected_value,
        )?,
        correction_type: row.correction_type,
        rationale: row.rationale,
        applied_to_training: row.applied_to_training,
        created_at: row.created_at,
    })
}
