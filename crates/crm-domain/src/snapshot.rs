//! Point-in-time capture of all pipeline data.
//!
//! `PipelineSnapshot` is what backing stores keep in memory and write to
//! disk. The write operations here carry the store-side rules (existence
//! checks, slug and ordinal uniqueness, delete guard) so every backend
//! enforces them identically.

use crm_core::{CrmError, CrmResult};
use serde::{Deserialize, Serialize};

use crate::contact::{find_duplicate, Contact, NewContact};
use crate::deal::{Deal, DealCategory, DealId, DealUpdate, NewDeal};
use crate::lead::{InboundLead, IngestedLead, LEAD_STAGE};
use crate::stage::{
    apply_reorder, default_stages, sort_by_ordinal, validate_reorder, Stage, StageOrder,
    StageUpdate,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl PipelineSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh workspace with the default pipeline.
    pub fn seeded() -> Self {
        Self {
            stages: default_stages(),
            ..Self::default()
        }
    }

    /// Installs the default stages when none exist. Returns whether it did.
    pub fn seed_if_empty(&mut self) -> bool {
        if !self.stages.is_empty() {
            return false;
        }
        self.stages = default_stages();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty() && self.deals.is_empty() && self.contacts.is_empty()
    }

    pub fn stages_sorted(&self) -> Vec<Stage> {
        let mut stages = self.stages.clone();
        sort_by_ordinal(&mut stages);
        stages
    }

    pub fn has_stage(&self, id: &str) -> bool {
        self.stages.iter().any(|s| s.id == id)
    }

    pub fn deals_in(&self, category: Option<DealCategory>) -> Vec<Deal> {
        self.deals
            .iter()
            .filter(|d| category.map_or(true, |c| d.category == c))
            .cloned()
            .collect()
    }

    pub fn deal(&self, id: DealId) -> Option<&Deal> {
        self.deals.iter().find(|d| d.id == id)
    }

    pub fn update_deal_stage(&mut self, id: DealId, stage_id: &str) -> CrmResult<Deal> {
        if self.deal(id).is_none() {
            return Err(CrmError::DealNotFound(id));
        }
        if !self.has_stage(stage_id) {
            return Err(CrmError::StageNotFound(stage_id.to_string()));
        }
        let deal = self
            .deals
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(CrmError::DealNotFound(id))?;
        deal.move_to_stage(stage_id);
        Ok(deal.clone())
    }

    pub fn create_deal(&mut self, new_deal: NewDeal) -> CrmResult<Deal> {
        if !self.has_stage(&new_deal.stage) {
            return Err(CrmError::StageNotFound(new_deal.stage));
        }
        if let Some(contact_id) = new_deal.contact_id {
            if !self.contacts.iter().any(|c| c.id == contact_id) {
                return Err(CrmError::NotFound(format!("Contact {}", contact_id)));
            }
        }
        let deal = new_deal.into_deal()?;
        self.deals.push(deal.clone());
        Ok(deal)
    }

    pub fn update_deal(&mut self, id: DealId, update: DealUpdate) -> CrmResult<Deal> {
        let deal = self
            .deals
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(CrmError::DealNotFound(id))?;
        deal.apply(update)?;
        Ok(deal.clone())
    }

    pub fn create_stage(&mut self, stage: Stage) -> CrmResult<Stage> {
        if stage.name.trim().is_empty() {
            return Err(CrmError::Validation("Stage name cannot be empty".into()));
        }
        if self.has_stage(&stage.id) {
            return Err(CrmError::Validation(format!(
                "Stage id '{}' already exists",
                stage.id
            )));
        }
        if self.stages.iter().any(|s| s.order == stage.order) {
            return Err(CrmError::Validation(format!(
                "Position {} is already taken",
                stage.order
            )));
        }
        self.stages.push(stage.clone());
        sort_by_ordinal(&mut self.stages);
        Ok(stage)
    }

    pub fn update_stage(&mut self, id: &str, update: StageUpdate) -> CrmResult<Stage> {
        let stage = self
            .stages
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CrmError::StageNotFound(id.to_string()))?;
        stage.apply(update);
        Ok(stage.clone())
    }

    /// All entries are applied or none are.
    pub fn reorder_stages(&mut self, orders: &[StageOrder]) -> CrmResult<()> {
        validate_reorder(&self.stages, orders)?;
        apply_reorder(&mut self.stages, orders);
        Ok(())
    }

    pub fn delete_stage(&mut self, id: &str) -> CrmResult<()> {
        let index = self
            .stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| CrmError::StageNotFound(id.to_string()))?;
        let deal_count = self.deals.iter().filter(|d| d.stage == id).count();
        if deal_count > 0 {
            return Err(CrmError::StageInUse {
                stage_id: id.to_string(),
                deal_count,
            });
        }
        if self.stages[index].is_default {
            return Err(CrmError::Validation(format!(
                "Cannot delete default stage '{}'",
                id
            )));
        }
        self.stages.remove(index);
        Ok(())
    }

    /// Updates the contact that already matches by phone or email with the
    /// incoming name and any key that was supplied, or adds a new one.
    pub fn upsert_contact(&mut self, new_contact: NewContact) -> CrmResult<Contact> {
        let candidate = new_contact.into_contact()?;
        let existing_id = find_duplicate(
            &self.contacts,
            candidate.phone.as_deref(),
            candidate.email.as_deref(),
        )
        .map(|c| c.id);

        match existing_id {
            Some(id) => {
                let contact = self
                    .contacts
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| CrmError::Internal("contact vanished during upsert".into()))?;
                contact.name = candidate.name;
                if candidate.phone.is_some() {
                    contact.phone = candidate.phone;
                }
                if candidate.email.is_some() {
                    contact.email = candidate.email;
                }
                Ok(contact.clone())
            }
            None => {
                self.contacts.push(candidate.clone());
                Ok(candidate)
            }
        }
    }

    /// Upserts the lead's contact and opens a deal for it in the first
    /// stage. Everything is checked before anything is written, so a
    /// rejected lead leaves contacts and deals untouched.
    pub fn ingest_lead(&mut self, lead: InboundLead) -> CrmResult<IngestedLead> {
        let new_contact = lead.contact()?;
        new_contact.clone().into_contact()?;
        if !self.has_stage(LEAD_STAGE) {
            return Err(CrmError::StageNotFound(LEAD_STAGE.to_string()));
        }
        let mut deal = lead.deal(LEAD_STAGE)?.into_deal()?;

        let contact = self.upsert_contact(new_contact)?;
        deal.contact_id = Some(contact.id);
        self.deals.push(deal.clone());
        Ok(IngestedLead { contact, deal })
    }

    /// Deals whose stage no longer exists.
    pub fn dangling_deals(&self) -> impl Iterator<Item = &Deal> {
        self.deals.iter().filter(|d| !self.has_stage(&d.stage))
    }
}
