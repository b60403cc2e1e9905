//! Shared state for the API layer.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::producer::ExtractionProducer;

/// Shared context for all API routes.
///
/// Database access is serialized through the connection mutex; review and
/// correction writes from concurrent clients are therefore last-write-wins
/// at this layer.
#[derive(Clone)]
pub struct ApiContext {
    db: Arc<Mutex<Connection>>,
    pub producer: Arc<dyn ExtractionProducer>,
}

impl ApiContext {
    pub fn new(db: Arc<Mutex<Connection>>, producer: Arc<dyn ExtractionProducer>) -> Self {
        Self { db, producer }
    }

    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))
    }
}
