use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReviewState;

/// Review state of one field, stored sparsely on the extraction record.
/// A field path absent from the map is `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStatus {
    pub status: ReviewState,
    #[serde(default)]
    pub reviewed_by: Option<Uuid>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewStatus {
    pub fn new(status: ReviewState) -> Self {
        Self {
            status,
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}
