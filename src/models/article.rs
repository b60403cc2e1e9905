use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ArticleStatus;

/// The article an extraction belongs to. Upload, storage and project
/// membership live outside this core; only ownership and the status
/// transition on extraction are kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub file_path: Option<String>,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(title: impl Into<String>, file_path: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            file_path,
            status: ArticleStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
