//! Deal filtering.
//!
//! The board partitions deals by stage and narrows them by the active
//! pipeline (category) filter; listing commands combine the same filters.

use crate::{Deal, DealCategory};

pub trait DealFilter {
    fn matches(&self, deal: &Deal) -> bool;
}

/// Deals sitting in one stage column.
#[derive(Debug, Clone, Copy)]
pub struct StageFilter<'a> {
    stage_id: &'a str,
}

impl<'a> StageFilter<'a> {
    pub fn new(stage_id: &'a str) -> Self {
        Self { stage_id }
    }
}

impl DealFilter for StageFilter<'_> {
    fn matches(&self, deal: &Deal) -> bool {
        deal.stage == self.stage_id
    }
}

/// Deals of one product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryFilter {
    category: DealCategory,
}

impl CategoryFilter {
    pub fn new(category: DealCategory) -> Self {
        Self { category }
    }
}

impl DealFilter for CategoryFilter {
    fn matches(&self, deal: &Deal) -> bool {
        deal.category == self.category
    }
}

pub struct ActiveOnlyFilter;

impl DealFilter for ActiveOnlyFilter {
    fn matches(&self, deal: &Deal) -> bool {
        deal.is_active()
    }
}

/// AND of all contained filters; empty matches everything.
#[derive(Default)]
pub struct CompositeFilter<'a> {
    filters: Vec<Box<dyn DealFilter + 'a>>,
}

impl<'a> CompositeFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Box<dyn DealFilter + 'a>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl DealFilter for CompositeFilter<'_> {
    fn matches(&self, deal: &Deal) -> bool {
        self.filters.iter().all(|f| f.matches(deal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DealStatus;

    fn deal(stage: &str, category: DealCategory) -> Deal {
        let mut deal = Deal::new("Deal", stage);
        deal.category = category;
        deal
    }

    #[test]
    fn test_stage_filter() {
        let filter = StageFilter::new("NOVO");
        assert!(filter.matches(&deal("NOVO", DealCategory::Auto)));
        assert!(!filter.matches(&deal("GANHO", DealCategory::Auto)));
    }

    #[test]
    fn test_category_filter() {
        let filter = CategoryFilter::new(DealCategory::Saude);
        assert!(filter.matches(&deal("NOVO", DealCategory::Saude)));
        assert!(!filter.matches(&deal("NOVO", DealCategory::Vida)));
    }

    #[test]
    fn test_composite_filter() {
        let mut inactive = deal("NOVO", DealCategory::Auto);
        inactive.status = DealStatus::Inactive;
        let active = deal("NOVO", DealCategory::Auto);
        let elsewhere = deal("COTACAO", DealCategory::Auto);

        assert!(CompositeFilter::new().matches(&inactive));

        let composite = CompositeFilter::new()
            .with_filter(Box::new(StageFilter::new("NOVO")))
            .with_filter(Box::new(CategoryFilter::new(DealCategory::Auto)))
            .with_filter(Box::new(ActiveOnlyFilter));
        assert!(composite.matches(&active));
        assert!(!composite.matches(&inactive));
        assert!(!composite.matches(&elsewhere));
    }
}
