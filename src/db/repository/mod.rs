pub mod article;
pub mod correction;
pub mod extraction;
pub mod grade;

pub use article::*;
pub use correction::*;
pub use extraction::*;
pub use grade::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::DatabaseError;

// Shared column helpers: JSON payloads and UUIDs are stored as TEXT.

pub(crate) fn json_col<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::MalformedColumn {
        column: "json".into(),
        reason: e.to_string(),
    })
}

pub(crate) fn json_col_opt<T: Serialize>(value: &Option<T>) -> Result<Option<String>, DatabaseError> {
    value.as_ref().map(json_col).transpose()
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::MalformedColumn {
        column: column.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_json_opt<T: DeserializeOwned>(
    column: &str,
    raw: Option<String>,
) -> Result<Option<T>, DatabaseError> {
    raw.as_deref().map(|s| parse_json(column, s)).transpose()
}

pub(crate) fn parse_uuid(column: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::MalformedColumn {
        column: column.into(),
        reason: e.to_string(),
    })
}

pub(crate) fn parse_uuid_opt(
    column: &str,
    raw: Option<String>,
) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(|s| parse_uuid(column, s)).transpose()
}
