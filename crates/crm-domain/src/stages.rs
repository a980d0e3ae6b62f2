//! Stage management: create, rename, reorder and delete pipeline columns.

use crm_core::{CrmError, CrmResult};
use std::sync::Arc;

use crate::stage::{
    next_ordinal, slugify, sort_by_ordinal, validate_reorder, Stage, StageColor, StageOrder,
    StageOutcome, StageUpdate,
};
use crate::store::PipelineStore;

pub struct StageManager<S: ?Sized> {
    store: Arc<S>,
}

impl<S: PipelineStore + ?Sized> StageManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn list_stages(&self) -> CrmResult<Vec<Stage>> {
        let mut stages = self.store.list_stages().await?;
        sort_by_ordinal(&mut stages);
        Ok(stages)
    }

    /// Appends a stage after the current last column. Its id is the slug of
    /// the name and never changes afterwards.
    pub async fn create_stage(
        &self,
        name: &str,
        color: StageColor,
        outcome: StageOutcome,
    ) -> CrmResult<Stage> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CrmError::Validation("Stage name cannot be empty".into()));
        }
        let id = slugify(name);
        if id.is_empty() {
            return Err(CrmError::Validation(format!(
                "Stage name '{}' has no usable characters",
                name
            )));
        }

        let existing = self.store.list_stages().await?;
        if existing.iter().any(|s| s.id == id) {
            return Err(CrmError::Validation(format!(
                "A stage with id '{}' already exists",
                id
            )));
        }

        let stage = Stage::new(id, name, next_ordinal(&existing), color, outcome);
        let created = self.store.create_stage(stage).await?;
        tracing::info!(stage_id = %created.id, order = created.order, "Created stage");
        Ok(created)
    }

    pub async fn update_stage(&self, id: &str, mut update: StageUpdate) -> CrmResult<Stage> {
        if let Some(name) = update.name.take() {
            let name = name.trim();
            if name.is_empty() {
                return Err(CrmError::Validation("Stage name cannot be empty".into()));
            }
            update.name = Some(name.to_string());
        }
        self.store.update_stage(id, update).await
    }

    /// Returns the stages in their new order.
    pub async fn reorder_stages(&self, orders: Vec<StageOrder>) -> CrmResult<Vec<Stage>> {
        let stages = self.store.list_stages().await?;
        validate_reorder(&stages, &orders)?;
        self.store.reorder_stages(&orders).await?;
        tracing::info!(count = orders.len(), "Reordered stages");
        self.list_stages().await
    }

    pub async fn delete_stage(&self, id: &str) -> CrmResult<()> {
        self.store.delete_stage(id).await?;
        tracing::info!(stage_id = id, "Deleted stage");
        Ok(())
    }
}
