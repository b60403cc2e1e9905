//! Ingestion of producer output into a versioned extraction record.
//!
//! One round: produce → migrate/normalize sections → derive completeness,
//! validation warnings and review flags → assign the next version →
//! persist → mark the article extracted. All I/O stays at this layer;
//! failures surface typed, and retries belong to the caller.

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::completeness;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::{ArticleStatus, Confidence, ExtractionStatus};
use crate::models::{CompletenessSummary, ExtractionRecord, FieldNode};
use crate::producer::{ExtractionProducer, ProducerError};
use crate::review;
use crate::validation;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Producer(#[from] ProducerError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Run one extraction round for an article and persist the result as the
/// article's next extraction version.
pub fn ingest_extraction(
    conn: &Connection,
    producer: &dyn ExtractionProducer,
    article_id: Uuid,
    user_id: Option<Uuid>,
    template_id: Option<Uuid>,
) -> Result<ExtractionRecord, IngestError> {
    let article = repository::get_article(conn, article_id)?;
    let produced = producer.produce(&article, template_id)?;

    let section = |name: &str| -> Option<FieldNode> {
        produced
            .data
            .get(name)
            .filter(|v| !v.is_null())
            .cloned()
            .map(FieldNode::from_value)
    };

    let now = Utc::now();
    let mut record = ExtractionRecord {
        id: Uuid::new_v4(),
        article_id,
        extracted_by: user_id,
        template_id,
        version: repository::count_extractions_for_article(conn, article_id)? + 1,
        status: ExtractionStatus::Completed,
        study_design: section("study_design"),
        population: section("population"),
        intervention: section("intervention"),
        comparator: section("comparator"),
        outcomes: section("outcomes"),
        setting: section("setting"),
        follow_up: section("follow_up"),
        funding: section("funding"),
        limitations: section("limitations"),
        conclusions: section("conclusions"),
        custom_fields: section("custom_fields"),
        completeness_summary: None,
        validation_warnings: Vec::new(),
        field_review_status: Default::default(),
        synthesis: None,
        raw_llm_response: produced.raw_response,
        prompt_tokens: produced.prompt_tokens,
        completion_tokens: produced.completion_tokens,
        model_used: produced.model_used,
        created_at: now,
        updated_at: now,
    };

    record.completeness_summary = Some(completeness::compute_summary(&record));
    record.validation_warnings = validation::validate_record(&record);
    record.field_review_status = review::seed_review_flags(&record);

    repository::insert_extraction(conn, &record)?;
    repository::update_article_status(conn, article_id, ArticleStatus::Extracted)?;

    let summary = record.completeness_summary.as_ref();
    tracing::info!(
        article_id = %article_id,
        version = record.version,
        total_fields = summary.map(|s| s.total_fields).unwrap_or(0),
        missing = summary.map(|s| s.missing).unwrap_or(0),
        flagged = record.field_review_status.len(),
        "Extraction ingested"
    );
    Ok(record)
}

/// Apply a reviewer-supplied sections payload as the article's next
/// extraction version.
///
/// Only keys present in the payload replace their sections (an explicit
/// null clears one); the raw shapes go through the same migration as
/// producer output, and derived data is recomputed. The base version is
/// never mutated.
pub fn revise_extraction(
    conn: &Connection,
    extraction_id: Uuid,
    updates: &serde_json::Value,
) -> Result<ExtractionRecord, IngestError> {
    let base = repository::get_extraction(conn, extraction_id)?;

    let mut next = base.clone();
    next.id = Uuid::new_v4();
    for name in crate::models::SECTION_NAMES.into_iter().chain(["custom_fields"]) {
        if let Some(raw) = updates.get(name) {
            let node = if raw.is_null() {
                None
            } else {
                Some(FieldNode::from_value(raw.clone()))
            };
            if let Some(slot) = next.section_mut(name) {
                *slot = node;
            }
        }
    }

    next.completeness_summary = Some(completeness::compute_summary(&next));
    next.validation_warnings = validation::validate_record(&next);
    next.version = repository::count_extractions_for_article(conn, base.article_id)? + 1;
    let now = Utc::now();
    next.created_at = now;
    next.updated_at = now;

    repository::insert_extraction(conn, &next)?;
    tracing::info!(
        article_id = %next.article_id,
        version = next.version,
        "Extraction revised as new version"
    );
    Ok(next)
}

/// Whether extraction quality warrants a verification pass: more than 20%
/// of countable fields are low confidence or missing.
pub fn needs_verification_pass(summary: &CompletenessSummary) -> bool {
    let shaky = (summary.low_confidence + summary.missing) as f64;
    shaky / f64::from(summary.total_fields.max(1)) > 0.2
}

/// Field paths worth sending back for verification: low confidence or
/// unclear-missing.
pub fn fields_needing_verification(record: &ExtractionRecord) -> Vec<String> {
    let mut paths = Vec::new();
    let mut visit = |path: &str, field: &crate::models::ExtractedField| {
        if field.needs_review() {
            paths.push(path.to_string());
        }
    };
    for (name, node) in record.sections() {
        if let Some(node) = node {
            node.walk_fields(name, &mut visit);
        }
    }
    if let Some(custom) = &record.custom_fields {
        custom.walk_fields("custom_fields", &mut visit);
    }
    paths
}

fn confidence_rank(confidence: Option<Confidence>) -> i32 {
    match confidence {
        Some(Confidence::High) => 3,
        Some(Confidence::Medium) => 2,
        Some(Confidence::Low) => 1,
        None => 0,
    }
}

/// Merge a verification-pass tree into the original extraction tree.
///
/// A verified field replaces the original only when it improves it: higher
/// confidence, or a value where the original had none. Groups merge by
/// key (keys absent from the original are ignored), lists by index.
pub fn merge_verification_pass(original: &mut FieldNode, verification: &FieldNode) {
    match (original, verification) {
        (FieldNode::Field(original), FieldNode::Field(verified)) => {
            if confidence_rank(verified.confidence) > confidence_rank(original.confidence)
                || (original.value.is_null() && !verified.value.is_null())
            {
                *original = verified.clone();
            }
        }
        (FieldNode::Group(original), FieldNode::Group(verification)) => {
            for (key, verified_node) in verification {
                if let Some(original_node) = original.get_mut(key) {
                    merge_verification_pass(original_node, verified_node);
                }
            }
        }
        (FieldNode::List(original), FieldNode::List(verification)) => {
            for (original_item, verified_item) in original.iter_mut().zip(verification) {
                merge_verification_pass(original_item, verified_item);
            }
        }
        _ => {}
    }
}
