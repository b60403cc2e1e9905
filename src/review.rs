//! Per-field review workflow.
//!
//! Each field path carries a tri-state review flag, cycled explicitly by a
//! reviewer. The map on the record is sparse: a path never touched by a
//! reviewer is `pending` without being materialized. Correcting a field
//! does not change its review state.
//!
//! Concurrent cycles on the same field path from different reviewers race
//! at the persistence layer; the winner is the last write. No merge policy
//! is defined here.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::enums::ReviewState;
use crate::models::{ExtractionRecord, ReviewStatus};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("field_path is required")]
    MissingFieldPath,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ReviewState {
    /// Next state in the fixed review cycle:
    /// pending → needs_review → verified → pending.
    pub fn cycle(self) -> Self {
        match self {
            ReviewState::Pending => ReviewState::NeedsReview,
            ReviewState::NeedsReview => ReviewState::Verified,
            ReviewState::Verified => ReviewState::Pending,
        }
    }
}

/// Review state of a field path; absent from the map means pending.
pub fn current_state(record: &ExtractionRecord, field_path: &str) -> ReviewState {
    record
        .field_review_status
        .get(field_path)
        .map(|s| s.status)
        .unwrap_or(ReviewState::Pending)
}

/// Set the review state of one field explicitly.
pub fn set_review_status(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
    state: ReviewState,
    reviewed_by: Option<Uuid>,
) -> Result<ReviewStatus, ReviewError> {
    if field_path.trim().is_empty() {
        return Err(ReviewError::MissingFieldPath);
    }
    let mut record = repository::get_extraction(conn, extraction_id)?;
    let status = ReviewStatus {
        status: state,
        reviewed_by,
        reviewed_at: Some(Utc::now()),
    };
    record
        .field_review_status
        .insert(field_path.to_string(), status.clone());
    repository::update_field_review_status(conn, extraction_id, &record.field_review_status)?;
    Ok(status)
}

/// Advance one field to the next state in the cycle.
pub fn cycle_review_status(
    conn: &Connection,
    extraction_id: Uuid,
    field_path: &str,
    reviewed_by: Option<Uuid>,
) -> Result<ReviewStatus, ReviewError> {
    if field_path.trim().is_empty() {
        return Err(ReviewError::MissingFieldPath);
    }
    let record = repository::get_extraction(conn, extraction_id)?;
    let next = current_state(&record, field_path).cycle();
    set_review_status(conn, extraction_id, field_path, next, reviewed_by)
}

/// Counts over the materialized review entries of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewProgress {
    pub total_fields: u32,
    pub verified: u32,
    pub needs_review: u32,
    pub pending: u32,
}

pub fn review_progress(record: &ExtractionRecord) -> ReviewProgress {
    let mut progress = ReviewProgress::default();
    for status in record.field_review_status.values() {
        progress.total_fields += 1;
        match status.status {
            ReviewState::Verified => progress.verified += 1,
            ReviewState::NeedsReview => progress.needs_review += 1,
            ReviewState::Pending => progress.pending += 1,
        }
    }
    progress
}

/// Flag fields needing reviewer attention at ingestion time.
///
/// Only `needs_review` entries are materialized (low confidence or unclear
/// missing reason); everything else stays absent, i.e. pending.
pub fn seed_review_flags(record: &ExtractionRecord) -> BTreeMap<String, ReviewStatus> {
    let mut flags = BTreeMap::new();
    let mut visit = |path: &str, field: &crate::models::ExtractedField| {
        if field.needs_review() {
            flags.insert(
                path.to_string(),
                ReviewStatus::new(ReviewState::NeedsReview),
            );
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
    flags
}
