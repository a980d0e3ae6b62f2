//! Process-local store, used by tests and for throwaway sessions.
//!
//! Besides holding a [`PipelineSnapshot`], it can be told to misbehave so the
//! rollback path of a board move can be exercised without a real network.

use async_trait::async_trait;
use crm_core::{CrmError, CrmResult};
use crm_domain::{
    Contact, Deal, DealCategory, DealId, DealUpdate, InboundLead, IngestedLead, NewContact,
    NewDeal, PipelineSnapshot, PipelineStore, Stage, StageOrder, StageUpdate,
};
use std::time::Duration;
use tokio::sync::Mutex;

/// Failures to inject into upcoming calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Every call fails with `Connection`.
    pub offline: bool,
    /// The next N `update_deal_stage` calls fail with `Connection`.
    pub fail_stage_updates: u32,
    /// Delay before each call is served.
    pub latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: PipelineSnapshot,
    faults: FaultPlan,
    stage_updates: usize,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the default pipeline stages.
    pub fn new() -> Self {
        Self::with_snapshot(PipelineSnapshot::seeded())
    }

    pub fn with_snapshot(snapshot: PipelineSnapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                ..Inner::default()
            }),
        }
    }

    pub async fn set_faults(&self, faults: FaultPlan) {
        self.inner.lock().await.faults = faults;
    }

    pub async fn set_offline(&self, offline: bool) {
        self.inner.lock().await.faults.offline = offline;
    }

    pub async fn fail_next_stage_updates(&self, count: u32) {
        self.inner.lock().await.faults.fail_stage_updates = count;
    }

    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().await.faults.latency = latency;
    }

    /// Number of `update_deal_stage` calls received, failed ones included.
    pub async fn stage_update_count(&self) -> usize {
        self.inner.lock().await.stage_updates
    }

    pub async fn snapshot(&self) -> PipelineSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    /// Waits out any configured latency, then checks the offline switch.
    async fn serve<T>(&self, f: impl FnOnce(&mut PipelineSnapshot) -> CrmResult<T>) -> CrmResult<T> {
        let latency = self.inner.lock().await.faults.latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        if inner.faults.offline {
            return Err(CrmError::Connection("store is offline".into()));
        }
        f(&mut inner.snapshot)
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn list_stages(&self) -> CrmResult<Vec<Stage>> {
        self.serve(|s| Ok(s.stages_sorted())).await
    }

    async fn list_deals(&self, category: Option<DealCategory>) -> CrmResult<Vec<Deal>> {
        self.serve(|s| Ok(s.deals_in(category))).await
    }

    async fn get_deal(&self, id: DealId) -> CrmResult<Option<Deal>> {
        self.serve(|s| Ok(s.deal(id).cloned())).await
    }

    async fn update_deal_stage(&self, id: DealId, stage_id: &str) -> CrmResult<Deal> {
        {
            let mut inner = self.inner.lock().await;
            inner.stage_updates += 1;
            if inner.faults.fail_stage_updates > 0 {
                inner.faults.fail_stage_updates -= 1;
                tracing::debug!(%id, stage_id, "Injected stage update failure");
                return Err(CrmError::Connection("injected failure".into()));
            }
        }
        self.serve(|s| s.update_deal_stage(id, stage_id)).await
    }

    async fn create_deal(&self, deal: NewDeal) -> CrmResult<Deal> {
        self.serve(|s| s.create_deal(deal)).await
    }

    async fn update_deal(&self, id: DealId, update: DealUpdate) -> CrmResult<Deal> {
        self.serve(|s| s.update_deal(id, update)).await
    }

    async fn create_stage(&self, stage: Stage) -> CrmResult<Stage> {
        self.serve(|s| s.create_stage(stage)).await
    }

    async fn update_stage(&self, id: &str, update: StageUpdate) -> CrmResult<Stage> {
        self.serve(|s| s.update_stage(id, update)).await
    }

    async fn reorder_stages(&self, orders: &[StageOrder]) -> CrmResult<()> {
        self.serve(|s| s.reorder_stages(orders)).await
    }

    async fn delete_stage(&self, id: &str) -> CrmResult<()> {
        self.serve(|s| s.delete_stage(id)).await
    }

    async fn list_contacts(&self) -> CrmResult<Vec<Contact>> {
        self.serve(|s| Ok(s.contacts.clone())).await
    }

    async fn upsert_contact(&self, contact: NewContact) -> CrmResult<Contact> {
        self.serve(|s| s.upsert_contact(contact)).await
    }

    async fn ingest_lead(&self, lead: InboundLead) -> CrmResult<IngestedLead> {
        self.serve(|s| s.ingest_lead(lead)).await
    }
}
