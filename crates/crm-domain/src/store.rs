use async_trait::async_trait;
use crm_core::CrmResult;

use crate::contact::{Contact, NewContact};
use crate::deal::{Deal, DealCategory, DealId, DealUpdate, NewDeal};
use crate::lead::{InboundLead, IngestedLead};
use crate::stage::{Stage, StageOrder, StageUpdate};

/// Durable home of stages, deals and contacts.
///
/// `update_deal_stage` is the single-record write behind every board move.
/// It fails with `DealNotFound`, `StageNotFound` or a transport error
/// (`Connection`) so callers can tell them apart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Stages in ordinal order.
    async fn list_stages(&self) -> CrmResult<Vec<Stage>>;

    async fn list_deals(&self, category: Option<DealCategory>) -> CrmResult<Vec<Deal>>;

    async fn get_deal(&self, id: DealId) -> CrmResult<Option<Deal>>;

    async fn update_deal_stage(&self, id: DealId, stage_id: &str) -> CrmResult<Deal>;

    async fn create_deal(&self, deal: NewDeal) -> CrmResult<Deal>;

    async fn update_deal(&self, id: DealId, update: DealUpdate) -> CrmResult<Deal>;

    async fn create_stage(&self, stage: Stage) -> CrmResult<Stage>;

    async fn update_stage(&self, id: &str, update: StageUpdate) -> CrmResult<Stage>;

    /// Applies every entry or none of them.
    async fn reorder_stages(&self, orders: &[StageOrder]) -> CrmResult<()>;

    /// Refused with `StageInUse` while any deal references the stage.
    async fn delete_stage(&self, id: &str) -> CrmResult<()>;

    async fn list_contacts(&self) -> CrmResult<Vec<Contact>>;

    /// Creates the contact, or updates the one that matches by phone or
    /// email with the incoming values.
    async fn upsert_contact(&self, contact: NewContact) -> CrmResult<Contact>;

    /// Contact upsert and deal creation as one write: both land or neither.
    async fn ingest_lead(&self, lead: InboundLead) -> CrmResult<IngestedLead>;
}
