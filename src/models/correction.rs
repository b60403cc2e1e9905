use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A `{value: ...}` envelope around a corrected or original datum.
/// The wrapper distinguishes "the value was null" from "no value was
/// captured at all" (envelope absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEnvelope {
    pub value: Value,
}

impl ValueEnvelope {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

/// One append-only ledger entry recording a human edit to a field.
///
/// The ledger is the audit trail, not the source of truth: the displayed
/// value for a field is always the record's stored value, and a correction
/// triggers a new record version through the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: Uuid,
    pub extraction_id: Uuid,
    pub user_id: Uuid,
    pub field_path: String,
    pub original_value: Option<ValueEnvelope>,
    pub corrected_value: ValueEnvelope,
    pub correction_type: Option<String>,
    pub rationale: Option<String>,
    pub applied_to_training: bool,
    pub created_at: DateTime<Utc>,
}
