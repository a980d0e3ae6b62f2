use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version written into every pipeline file.
pub const FORMAT_VERSION: u32 = 1;

/// Written alongside the data on every save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    pub format_version: u32,
    /// Process that performed the save
    pub instance_id: Uuid,
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            instance_id,
            saved_at: Utc::now(),
        }
    }
}
