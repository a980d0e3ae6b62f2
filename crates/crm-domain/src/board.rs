//! Board State Store.
//!
//! Working copy of stages and deals that the board renders. Deal placement
//! changes only through [`BoardStore::set_deal_stage`], which never touches
//! the backing store.

use chrono::{DateTime, Utc};
use crm_core::{CrmError, CrmResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use crate::deal::{Deal, DealCategory, DealId};
use crate::filter::{CategoryFilter, DealFilter, StageFilter};
use crate::stage::{apply_reorder, sort_by_ordinal, Stage, StageColor, StageId, StageOrder};
use crate::store::PipelineStore;

/// Header numbers of one board column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub stage_id: StageId,
    pub name: String,
    pub color: StageColor,
    pub deal_count: usize,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct BoardStore {
    stages: Vec<Stage>,
    deals: Vec<Deal>,
    category: Option<DealCategory>,
    loaded_at: Option<DateTime<Utc>>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(mut stages: Vec<Stage>, deals: Vec<Deal>) -> Self {
        sort_by_ordinal(&mut stages);
        Self {
            stages,
            deals,
            category: None,
            loaded_at: None,
        }
    }

    /// Replaces the board with the store's current stages and deals.
    ///
    /// On failure the previous contents stay in place so a transient outage
    /// does not blank the board.
    pub async fn load_all<S: PipelineStore + ?Sized>(&mut self, store: &S) -> CrmResult<()> {
        let mut stages = store
            .list_stages()
            .await
            .map_err(|e| CrmError::Load(format!("stages: {}", e)))?;
        let deals = store
            .list_deals(None)
            .await
            .map_err(|e| CrmError::Load(format!("deals: {}", e)))?;

        sort_by_ordinal(&mut stages);
        tracing::info!(
            stages = stages.len(),
            deals = deals.len(),
            "Loaded pipeline board"
        );
        self.stages = stages;
        self.deals = deals;
        self.loaded_at = Some(Utc::now());
        Ok(())
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Stages in ordinal (left to right) order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn has_stage(&self, id: &str) -> bool {
        self.stage(id).is_some()
    }

    /// Every deal, ignoring the category filter.
    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }

    pub fn deal(&self, id: DealId) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == id)
    }

    pub fn category_filter(&self) -> Option<DealCategory> {
        self.category
    }

    pub fn set_category_filter(&mut self, category: Option<DealCategory>) {
        self.category = category;
    }

    /// Deals shown in one column, in load order.
    pub fn group_by_stage<'a>(&'a self, stage_id: &'a str) -> StageDeals<'a> {
        StageDeals {
            inner: self.deals.iter(),
            stage: StageFilter::new(stage_id),
            category: self.category.map(CategoryFilter::new),
        }
    }

    /// Moves a deal on the board only. Returns the stage it left so the
    /// caller can put it back.
    pub fn set_deal_stage(&mut self, deal_id: DealId, new_stage: &str) -> CrmResult<StageId> {
        if !self.has_stage(new_stage) {
            return Err(CrmError::StageNotFound(new_stage.to_string()));
        }
        let deal = self
            .deals
            .iter_mut()
            .find(|d| d.id == deal_id)
            .ok_or(CrmError::DealNotFound(deal_id))?;
        Ok(std::mem::replace(&mut deal.stage, new_stage.to_string()))
    }

    /// Adopts the store's version of one deal. Returns false if it was new.
    pub fn replace_deal(&mut self, deal: Deal) -> bool {
        match self.deals.iter_mut().find(|d| d.id == deal.id) {
            Some(existing) => {
                *existing = deal;
                true
            }
            None => {
                self.deals.push(deal);
                false
            }
        }
    }

    pub fn upsert_stage(&mut self, stage: Stage) {
        match self.stages.iter_mut().find(|s| s.id == stage.id) {
            Some(existing) => *existing = stage,
            None => self.stages.push(stage),
        }
        sort_by_ordinal(&mut self.stages);
    }

    pub fn remove_stage(&mut self, id: &str) -> Option<Stage> {
        let index = self.stages.iter().position(|s| s.id == id)?;
        Some(self.stages.remove(index))
    }

    pub fn apply_stage_order(&mut self, orders: &[StageOrder]) {
        apply_reorder(&mut self.stages, orders);
    }

    /// Re-applies optimistic placements that a reload would otherwise undo
    /// while their commits are still in flight.
    pub fn apply_overlay(&mut self, overlay: &HashMap<DealId, StageId>) {
        for (deal_id, stage_id) in overlay {
            if let Err(e) = self.set_deal_stage(*deal_id, stage_id) {
                tracing::debug!(
                    %deal_id,
                    stage_id = %stage_id,
                    error = %e,
                    "Skipping stale overlay entry"
                );
            }
        }
    }

    /// One summary per stage in ordinal order, over the filtered deals.
    pub fn column_summaries(&self) -> Vec<ColumnSummary> {
        self.stages
            .iter()
            .map(|stage| {
                let deals = self.group_by_stage(&stage.id);
                ColumnSummary {
                    stage_id: stage.id.clone(),
                    name: stage.name.clone(),
                    color: stage.color,
                    deal_count: deals.clone().count(),
                    total_value: deals.filter_map(|d| d.value).sum(),
                }
            })
            .collect()
    }

    /// Deals whose stage is missing from the board. Empty while the board is
    /// consistent.
    pub fn dangling_deals(&self) -> impl Iterator<Item = &Deal> {
        self.deals.iter().filter(|d| !self.has_stage(&d.stage))
    }
}

/// Lazy, restartable view over one column's deals.
#[derive(Debug, Clone)]
pub struct StageDeals<'a> {
    inner: std::slice::Iter<'a, Deal>,
    stage: StageFilter<'a>,
    category: Option<CategoryFilter>,
}

impl<'a> Iterator for StageDeals<'a> {
    type Item = &'a Deal;

    fn next(&mut self) -> Option<Self::Item> {
        let Self {
            inner,
            stage,
            category,
        } = self;
        inner.find(|deal| stage.matches(deal) && category.map_or(true, |c| c.matches(deal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageOutcome;
    use crate::store::MockPipelineStore;
    use uuid::Uuid;

    fn stages() -> Vec<Stage> {
        vec![
            Stage::new("GANHO", "Ganho", 2, StageColor::Green, StageOutcome::Won),
            Stage::new("NOVO", "Novo", 0, StageColor::Blue, StageOutcome::Open),
            Stage::new("COTACAO", "Cotação", 1, StageColor::Yellow, StageOutcome::Open),
        ]
    }

    fn deal(title: &str, stage: &str, category: DealCategory, value: Option<i64>) -> Deal {
        let mut deal = Deal::new(title, stage);
        deal.category = category;
        deal.value = value.map(Decimal::from);
        deal
    }

    fn board() -> BoardStore {
        BoardStore::from_parts(
            stages(),
            vec![
                deal("A", "NOVO", DealCategory::Auto, Some(1000)),
                deal("B", "COTACAO", DealCategory::Saude, Some(250)),
                deal("C", "NOVO", DealCategory::Saude, None),
                deal("D", "NOVO", DealCategory::Auto, Some(500)),
            ],
        )
    }

    #[test]
    fn test_stages_are_ordered() {
        let board = board();
        let ids: Vec<_> = board.stages().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["NOVO", "COTACAO", "GANHO"]);
    }

    #[test]
    fn test_group_by_stage_keeps_order_and_restarts() {
        let mut board = board();
        let column = board.group_by_stage("NOVO");
        let titles: Vec<_> = column.clone().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["A", "C", "D"]);
        assert_eq!(column.count(), 3);

        board.set_category_filter(Some(DealCategory::Auto));
        let titles: Vec<_> = board.group_by_stage("NOVO").map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["A", "D"]);
        assert_eq!(board.group_by_stage("COTACAO").count(), 0);
    }

    #[test]
    fn test_set_deal_stage_returns_previous() {
        let mut board = board();
        let id = board.deals()[0].id;

        let previous = board.set_deal_stage(id, "GANHO").unwrap();
        assert_eq!(previous, "NOVO");
        assert_eq!(board.deal(id).unwrap().stage, "GANHO");

        assert!(matches!(
            board.set_deal_stage(id, "NOWHERE"),
            Err(CrmError::StageNotFound(_))
        ));
        assert!(matches!(
            board.set_deal_stage(Uuid::new_v4(), "NOVO"),
            Err(CrmError::DealNotFound(_))
        ));
        assert_eq!(board.deal(id).unwrap().stage, "GANHO");
    }

    #[test]
    fn test_column_summaries() {
        let mut board = board();
        let summaries = board.column_summaries();
        assert_eq!(summaries[0].stage_id, "NOVO");
        assert_eq!(summaries[0].deal_count, 3);
        assert_eq!(summaries[0].total_value, Decimal::from(1500));
        assert_eq!(summaries[2].deal_count, 0);
        assert_eq!(summaries[2].total_value, Decimal::ZERO);

        board.set_category_filter(Some(DealCategory::Saude));
        let summaries = board.column_summaries();
        assert_eq!(summaries[0].deal_count, 1);
        assert_eq!(summaries[0].total_value, Decimal::ZERO);
        assert_eq!(summaries[1].total_value, Decimal::from(250));
    }

    #[test]
    fn test_overlay_and_stage_edits() {
        let mut board = board();
        let id = board.deals()[1].id;

        let overlay = HashMap::from([(id, "GANHO".to_string()), (Uuid::new_v4(), "NOVO".into())]);
        board.apply_overlay(&overlay);
        assert_eq!(board.deal(id).unwrap().stage, "GANHO");

        board.apply_stage_order(&[StageOrder::new("NOVO", 2), StageOrder::new("GANHO", 0)]);
        assert_eq!(board.stages()[0].id, "GANHO");

        board.remove_stage("COTACAO");
        assert_eq!(board.dangling_deals().count(), 0);
        board.remove_stage("GANHO");
        assert_eq!(board.dangling_deals().count(), 1);
    }

    #[tokio::test]
    async fn test_load_all_replaces_contents() {
        let mut store = MockPipelineStore::new();
        store.expect_list_stages().returning(|| Ok(stages()));
        store
            .expect_list_deals()
            .returning(|_| Ok(vec![Deal::new("Fresh", "COTACAO")]));

        let mut board = board();
        board.load_all(&store).await.unwrap();

        assert_eq!(board.deals().len(), 1);
        assert_eq!(board.stages()[0].id, "NOVO");
        assert!(board.loaded_at().is_some());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_state() {
        let mut store = MockPipelineStore::new();
        store.expect_list_stages().returning(|| Ok(stages()));
        store
            .expect_list_deals()
            .returning(|_| Err(CrmError::Connection("database unreachable".into())));

        let mut board = board();
        let before: Vec<_> = board.deals().iter().map(|d| d.id).collect();

        let result = board.load_all(&store).await;
        assert!(matches!(result, Err(CrmError::Load(_))));
        let after: Vec<_> = board.deals().iter().map(|d| d.id).collect();
        assert_eq!(before, after);
        assert_eq!(board.stages().len(), 3);
    }
}
