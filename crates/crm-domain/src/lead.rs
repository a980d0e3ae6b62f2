//! Inbound leads: a contact plus a fresh deal at the head of the pipeline.

use chrono::NaiveDate;
use crm_core::{CrmError, CrmResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contact::{Contact, NewContact};
use crate::deal::{Deal, DealCategory, NewDeal};
use crate::stage::StageId;

/// Stage every ingested lead starts in.
pub const LEAD_STAGE: &str = "NOVO";

/// Key in the extra fields that carries the policy renewal date.
pub const RENEWAL_KEY: &str = "renovacao";

const UNNAMED_CONTACT: &str = "Sem Nome";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundLead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Insurance line the lead asked about, when known.
    #[serde(default)]
    pub category: Option<DealCategory>,
    /// Deal title supplied by the source; derived when absent.
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    /// Category specific fields, kept as the deal's attributes.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedLead {
    pub contact: Contact,
    pub deal: Deal,
}

impl InboundLead {
    fn display_name(&self) -> &str {
        match self.name.trim() {
            "" => UNNAMED_CONTACT,
            name => name,
        }
    }

    /// `summary`, or `"<category> - <name>"`.
    pub fn title(&self) -> String {
        match self.summary.as_deref().map(str::trim) {
            Some(summary) if !summary.is_empty() => summary.to_string(),
            _ => {
                let kind = self.category.map_or("Seguro", |c| c.as_str());
                format!("{} - {}", kind, self.display_name())
            }
        }
    }

    /// Renewal date from the extra fields. Accepts `YYYY-MM-DD` and full
    /// timestamps that start with one.
    pub fn renewal_date(&self) -> CrmResult<Option<NaiveDate>> {
        let Some(raw) = self.extra.get(RENEWAL_KEY) else {
            return Ok(None);
        };
        let text = match raw {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim(),
            other => {
                return Err(CrmError::Validation(format!(
                    "Renewal date must be a string, got {}",
                    other
                )))
            }
        };
        let date = text.get(..10).unwrap_or(text);
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| CrmError::Validation(format!("Invalid renewal date '{}': {}", text, e)))
    }

    pub fn contact(&self) -> CrmResult<NewContact> {
        let has_phone = self
            .phone
            .as_deref()
            .and_then(Contact::normalize_phone)
            .is_some();
        if !has_phone {
            return Err(CrmError::Validation(
                "Phone is required to deduplicate a lead".into(),
            ));
        }
        Ok(NewContact {
            name: self.display_name().to_string(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        })
    }

    /// The deal this lead opens, not yet linked to its contact.
    pub fn deal(&self, stage: impl Into<StageId>) -> CrmResult<NewDeal> {
        let mut deal = NewDeal::new(self.title(), stage);
        deal.value = self.value;
        deal.category = self.category.unwrap_or_default();
        deal.renewal_date = self.renewal_date()?;
        deal.attributes = self.extra.clone();
        Ok(deal)
    }
}
