use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Failed to load board: {0}")]
    Load(String),

    #[error("Failed to move deal {deal_id} to stage '{stage_id}'")]
    Reconcile {
        deal_id: Uuid,
        stage_id: String,
        #[source]
        source: Box<CrmError>,
    },

    #[error("Stage '{stage_id}' still holds {deal_count} deal(s)")]
    StageInUse { stage_id: String, deal_count: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deal not found: {0}")]
    DealNotFound(Uuid),

    #[error("Stage not found: {0}")]
    StageNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Drag session busy: {0}")]
    SessionBusy(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmError {
    /// Transport-level failures that may succeed on another attempt.
    /// A rejected write (unknown deal or stage) never will.
    pub fn is_transient(&self) -> bool {
        matches!(self, CrmError::Connection(_) | CrmError::Timeout(_))
    }
}
