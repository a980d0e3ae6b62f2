use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::deal::DealId;

pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An optimistic move was undone because the store refused it.
    Rollback,
    Error,
    Success,
}

/// Transient, dismissible toast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.created_at > ttl,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    next_id: NotificationId,
    active: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        deal_id: Option<DealId>,
    ) -> NotificationId {
        self.next_id += 1;
        let id = self.next_id;
        self.active.push(Notification {
            id,
            kind,
            message: message.into(),
            deal_id,
            created_at: Utc::now(),
        });
        id
    }

    pub fn rollback(&mut self, deal_id: DealId, message: impl Into<String>) -> NotificationId {
        self.push(NotificationKind::Rollback, message, Some(deal_id))
    }

    /// Returns false when the toast was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() != before
    }

    pub fn expire(&mut self, ttl: Duration) {
        let now = Utc::now();
        self.active.retain(|n| !n.is_expired(ttl, now));
    }

    pub fn active(&self) -> &[Notification] {
        &self.active
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.active)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
