//! Correction ledger — append-only history of human edits to extracted
//! fields.
//!
//! The ledger never overwrites or deletes prior entries; the record's
//! stored value stays the source of truth for display. Applying a
//! correction produces the article's next extraction version with derived
//! data recomputed, leaving every past version untouched.

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::completeness;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::field::FieldPathError;
use crate::models::{Correction, ExtractionRecord, ValueEnvelope};
use crate::validation;

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("corrected_value is required")]
    MissingCorrectedValue,
    #[error("field_path is required")]
    MissingFieldPath,
    #[error(transparent)]
    FieldPath(#[from] FieldPathError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A correction as submitted by the reviewer, before validation.
#[derive(Debug, Clone)]
pub struct NewCorrection {
    pub extraction_id: Uuid,
    pub user_id: Uuid,
    pub field_path: String,
    pub original_value: Option<ValueEnvelope>,
    pub corrected_value: Option<ValueEnvelope>,
    pub correction_type: Option<String>,
    pub rationale: Option<String>,
}

/// Append a correction to the ledger.
///
/// Caller contract violations (no corrected value, empty field path) are
/// rejected before any ledger entry is constructed.
pub fn submit_correction(
    conn: &Connection,
    new: NewCorrection,
) -> Result<Correction, CorrectionError> {
    let corrected_value = new
        .corrected_value
        .ok_or(CorrectionError::MissingCorrectedValue)?;
    if new.field_path.trim().is_empty() {
        return Err(CorrectionError::MissingFieldPath);
    }
    // The extraction must exist before anything is written.
    repository::get_extraction(conn, new.extraction_id)?;

    let correction = Correction {
        id: Uuid::new_v4(),
        extraction_id: new.extraction_id,
        user_id: new.user_id,
        field_path: new.field_path,
        original_value: new.original_value,
        corrected_value,
        correction_type: new.correction_type,
        rationale: new.rationale,
        applied_to_training: false,
        created_at: Utc::now(),
    };
    repository::insert_correction(conn, &correction)?;

    tracing::debug!(
        extraction_id = %correction.extraction_id,
        field_path = %correction.field_path,
        "Correction recorded"
    );
    Ok(correction)
}

/// Ledger entries for one field, oldest first.
pub fn corrections_for(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
) -> Result<Vec<Correction>, CorrectionError> {
    Ok(repository::corrections_for_field(
        conn,
        extraction_id,
        field_path,
    )?)
}

/// All ledger entries for an extraction, oldest first.
pub fn list_corrections(
    conn: &Connection,
    extraction_id: Uuid,
) -> Result<Vec<Correction>, CorrectionError> {
    Ok(repository::list_corrections(conn, extraction_id)?)
}

/// Display flag only — never consulted by completeness aggregation.
pub fn has_correction_history(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
) -> Result<bool, CorrectionError> {
    Ok(repository::has_correction_history(
        conn,
        extraction_id,
        field_path,
    )?)
}

/// Apply a recorded correction to the extraction it references, producing
/// the article's next version with completeness, validation warnings and
/// review flags recomputed. The referenced version itself is never mutated.
pub fn apply_correction(
    conn: &Connection,
    correction: &Correction,
) -> Result<ExtractionRecord, CorrectionError> {
    let base = repository::get_extraction(conn, correction.extraction_id)?;

    let mut next = base.clone();
    next.id = Uuid::new_v4();
    next.set_field_value(
        &correction.field_path,
        correction.corrected_value.value.clone(),
    )?;

    next.completeness_summary = Some(completeness::compute_summary(&next));
    next.validation_warnings = validation::validate_record(&next);
    // Correcting a field does not verify it; carried review state stands.
    next.version = repository::count_extractions_for_article(conn, base.article_id)? + 1;
    let now = Utc::now();
    next.created_at = now;
    next.updated_at = now;

    repository::insert_extraction(conn, &next)?;

    tracing::info!(
        article_id = %next.article_id,
        version = next.version,
        field_path = %correction.field_path,
        "Correction applied as new extraction version"
    );
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_article, insert_extraction};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::ExtractionStatus;
    use crate::models::{Article, FieldNode};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn seeded_extraction(conn: &Connection) -> ExtractionRecord {
        let article = Article::new("Trial", None);
        insert_article(conn, &article).unwrap();

        let now = Utc::now();
        let record = ExtractionRecord {
            id: Uuid::new_v4(),
            article_id: article.id,
            extracted_by: None,
            template_id: None,
            version: 1,
            status: ExtractionStatus::Completed,
            study_design: Some(FieldNode::from_value(json!({
                "design": {"value": "cohort", "confidence": "low"}
            }))),
            population: Some(FieldNode::from_value(json!({
                "sample_size": {"value": null, "missing_reason": "unclear"}
            }))),
            intervention: None,
            comparator: None,
            outcomes: None,
            setting: None,
            follow_up: None,
            funding: None,
            limitations: None,
            conclusions: None,
            custom_fields: None,
            completeness_summary: None,
            validation_warnings: Vec::new(),
            field_review_status: BTreeMap::new(),
            synthesis: None,
            raw_llm_response: None,
            prompt_tokens: None,
            completion_tokens: None,
            model_used: None,
            created_at: now,
            updated_at: now,
        };
        insert_extraction(conn, &record).unwrap();
        record
    }

    fn new_correction(extraction_id: Uuid, field_path: &str) -> NewCorrection {
        NewCorrection {
            extraction_id,
            user_id: Uuid::new_v4(),
            field_path: field_path.to_string(),
            original_value: Some(ValueEnvelope::new(json!("cohort"))),
            corrected_value: Some(ValueEnvelope::new(json!("RCT"))),
            correction_type: Some("value_change".to_string()),
            rationale: Some("methods section states randomization".to_string()),
        }
    }

    #[test]
    fn submit_appends_exactly_one_entry() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);

        for expected in 1..=3 {
            submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();
            let entries = corrections_for(&conn, record.id, "study_design.design").unwrap();
            assert_eq!(entries.len(), expected);
            // Re-reading never shrinks the ledger.
            let again = corrections_for(&conn, record.id, "study_design.design").unwrap();
            assert_eq!(again.len(), expected);
        }
    }

    #[test]
    fn entries_come_back_oldest_first() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);

        let first =
            submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();
        let second =
            submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();

        let entries = corrections_for(&conn, record.id, "study_design.design").unwrap();
        assert_eq!(entries[0].id, first.id);
        assert_eq!(entries[1].id, second.id);
    }

    #[test]
    fn missing_corrected_value_rejected_before_write() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);

        let mut new = new_correction(record.id, "study_design.design");
        new.corrected_value = None;
        let err = submit_correction(&conn, new).unwrap_err();
        assert!(matches!(err, CorrectionError::MissingCorrectedValue));
        assert!(list_corrections(&conn, record.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_extraction_rejected() {
        let conn = open_memory_database().unwrap();
        seeded_extraction(&conn);
        let err =
            submit_correction(&conn, new_correction(Uuid::new_v4(), "study_design.design"))
                .unwrap_err();
        assert!(matches!(
            err,
            CorrectionError::Database(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn history_flag_tracks_field_path() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);

        assert!(!has_correction_history(&conn, record.id, "study_design.design").unwrap());
        submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();
        assert!(has_correction_history(&conn, record.id, "study_design.design").unwrap());
        assert!(!has_correction_history(&conn, record.id, "population.sample_size").unwrap());
    }

    #[test]
    fn apply_correction_creates_next_version() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);

        let correction =
            submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();
        let next = apply_correction(&conn, &correction).unwrap();

        assert_eq!(next.version, 2);
        assert_ne!(next.id, record.id);
        let corrected = next
            .study_design
            .as_ref()
            .unwrap()
            .child("design")
            .unwrap()
            .as_field()
            .unwrap();
        assert_eq!(corrected.value, json!("RCT"));
        assert!(next.completeness_summary.is_some());

        // The original version is untouched.
        let original = repository::get_extraction(&conn, record.id).unwrap();
        assert_eq!(original.version, 1);
        let field = original
            .study_design
            .as_ref()
            .unwrap()
            .child("design")
            .unwrap()
            .as_field()
            .unwrap();
        assert_eq!(field.value, json!("cohort"));
    }

    #[test]
    fn history_flag_does_not_touch_completeness() {
        let conn = open_memory_database().unwrap();
        let record = seeded_extraction(&conn);
        let before = completeness::compute_summary(&record);

        submit_correction(&conn, new_correction(record.id, "study_design.design")).unwrap();

        let after =
            completeness::compute_summary(&repository::get_extraction(&conn, record.id).unwrap());
        assert_eq!(before, after);
    }
}
