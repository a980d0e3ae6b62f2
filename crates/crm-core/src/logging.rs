use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a record's activity trail, e.g. a stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
        }
    }
}

pub trait Loggable {
    fn add_log(&mut self, message: String);
    fn get_logs(&self) -> &[LogEntry];
}
