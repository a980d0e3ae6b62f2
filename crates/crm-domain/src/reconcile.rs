//! Reconciliation Client: the durable write behind a board move.

use async_trait::async_trait;
use crm_core::{AppConfig, CrmError, CrmResult};
use std::sync::Arc;
use std::time::Duration;

use crate::deal::{Deal, DealId};
use crate::store::PipelineStore;

/// Persists a deal's new stage. Every failure comes back as
/// `CrmError::Reconcile`; there is no partial success.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageCommitter: Send + Sync {
    async fn commit_stage(&self, deal_id: DealId, stage_id: &str) -> CrmResult<Deal>;
}

pub struct ReconciliationClient<S: ?Sized> {
    store: Arc<S>,
    timeout: Duration,
    retries: u32,
}

impl<S: PipelineStore + ?Sized> ReconciliationClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::from_config(store, &AppConfig::default())
    }

    pub fn from_config(store: Arc<S>, config: &AppConfig) -> Self {
        Self {
            store,
            timeout: config.effective_reconcile_timeout(),
            retries: config.effective_reconcile_retries(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra attempts after a transient failure. Zero means one attempt.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    async fn attempt(&self, deal_id: DealId, stage_id: &str) -> CrmResult<Deal> {
        match tokio::time::timeout(self.timeout, self.store.update_deal_stage(deal_id, stage_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CrmError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl<S: PipelineStore + ?Sized> StageCommitter for ReconciliationClient<S> {
    async fn commit_stage(&self, deal_id: DealId, stage_id: &str) -> CrmResult<Deal> {
        let mut attempt = 0;
        loop {
            match self.attempt(deal_id, stage_id).await {
                Ok(deal) => {
                    tracing::info!(%deal_id, stage_id, "Committed stage change");
                    return Ok(deal);
                }
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(%deal_id, stage_id, attempt, error = %e, "Retrying stage commit");
                }
                Err(e) => {
                    tracing::warn!(%deal_id, stage_id, error = %e, "Stage commit failed");
                    return Err(CrmError::Reconcile {
                        deal_id,
                        stage_id: stage_id.to_string(),
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}
