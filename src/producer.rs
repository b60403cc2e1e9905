//! Seam to the external extraction producer (the AI call lives behind it).

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Article;

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("extraction producer unavailable: {0}")]
    Unavailable(String),
    #[error("producer returned malformed output: {0}")]
    Malformed(String),
}

/// Raw producer output for one article, before migration/normalization.
#[derive(Debug, Clone)]
pub struct ProducedExtraction {
    /// JSON object keyed by section name, plus optional `custom_fields`.
    pub data: Value,
    /// Verbatim model response, kept for audit.
    pub raw_response: Option<Value>,
    pub model_used: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

pub trait ExtractionProducer: Send + Sync {
    fn produce(
        &self,
        article: &Article,
        template_id: Option<Uuid>,
    ) -> Result<ProducedExtraction, ProducerError>;
}

/// Default wiring of the service binary: every call fails until a real
/// producer is linked in. Review, correction and GRADE endpoints work
/// against stored data regardless.
pub struct UnconfiguredProducer;

impl ExtractionProducer for UnconfiguredProducer {
    fn produce(
        &self,
        _article: &Article,
        _template_id: Option<Uuid>,
    ) -> Result<ProducedExtraction, ProducerError> {
        Err(ProducerError::Unavailable(
            "no extraction producer configured".to_string(),
        ))
    }
}
