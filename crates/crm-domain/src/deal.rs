use chrono::{DateTime, NaiveDate, Utc};
use crm_core::{CrmError, CrmResult, LogEntry, Loggable};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::contact::ContactId;
use crate::field_update::FieldUpdate;
use crate::stage::StageId;

pub type DealId = Uuid;

/// Insurance product line; doubles as the board's pipeline filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealCategory {
    Auto,
    Saude,
    Vida,
    Consorcio,
    Empresarial,
    #[default]
    Outro,
}

impl DealCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealCategory::Auto => "AUTO",
            DealCategory::Saude => "SAUDE",
            DealCategory::Vida => "VIDA",
            DealCategory::Consorcio => "CONSORCIO",
            DealCategory::Empresarial => "EMPRESARIAL",
            DealCategory::Outro => "OUTRO",
        }
    }
}

impl fmt::Display for DealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealCategory {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(DealCategory::Auto),
            "SAUDE" => Ok(DealCategory::Saude),
            "VIDA" => Ok(DealCategory::Vida),
            "CONSORCIO" => Ok(DealCategory::Consorcio),
            "EMPRESARIAL" => Ok(DealCategory::Empresarial),
            "OUTRO" => Ok(DealCategory::Outro),
            _ => Err(CrmError::Validation(format!("Unknown deal category: '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub title: String,
    #[serde(default)]
    pub value: Option<Decimal>,
    pub stage: StageId,
    #[serde(default)]
    pub category: DealCategory,
    /// Category specific fields (vehicle plate, number of lives, ...).
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub renewal_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: DealStatus,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Deal {
    pub fn new(title: impl Into<String>, stage: impl Into<StageId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            value: None,
            stage: stage.into(),
            category: DealCategory::default(),
            attributes: Map::new(),
            renewal_date: None,
            status: DealStatus::default(),
            contact_id: None,
            created_at: now,
            updated_at: now,
            logs: Vec::new(),
        }
    }

    pub fn validate_value(value: Option<&Decimal>) -> CrmResult<()> {
        match value {
            Some(v) if v.is_sign_negative() && !v.is_zero() => Err(CrmError::Validation(
                format!("Deal value cannot be negative: {}", v),
            )),
            _ => Ok(()),
        }
    }

    /// Durable stage change, recorded in the deal's activity trail.
    pub fn move_to_stage(&mut self, stage: impl Into<StageId>) {
        let stage = stage.into();
        if stage == self.stage {
            return;
        }
        let message = format!("Stage changed from {} to {}", self.stage, stage);
        self.stage = stage;
        self.add_log(message);
    }

    pub fn apply(&mut self, update: DealUpdate) -> CrmResult<()> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(CrmError::Validation("Deal title cannot be empty".into()));
            }
        }
        Self::validate_value(update.value.as_set())?;

        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        update.value.apply_to(&mut self.value);
        if let Some(category) = update.category {
            self.category = category;
        }
        update.renewal_date.apply_to(&mut self.renewal_date);
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(attributes) = update.attributes {
            self.attributes.extend(attributes);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == DealStatus::Active
    }
}

impl Loggable for Deal {
    fn add_log(&mut self, message: String) {
        self.logs.push(LogEntry::new(message));
        self.updated_at = Utc::now();
    }

    fn get_logs(&self) -> &[LogEntry] {
        &self.logs
    }
}

/// Manual entry of a deal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub title: String,
    pub stage: StageId,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub category: DealCategory,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub renewal_date: Option<NaiveDate>,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
}

impl NewDeal {
    pub fn new(title: impl Into<String>, stage: impl Into<StageId>) -> Self {
        Self {
            title: title.into(),
            stage: stage.into(),
            ..Self::default()
        }
    }

    pub fn into_deal(self) -> CrmResult<Deal> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CrmError::Validation("Deal title cannot be empty".into()));
        }
        Deal::validate_value(self.value.as_ref())?;

        let mut deal = Deal::new(title, self.stage);
        deal.value = self.value;
        deal.category = self.category;
        deal.attributes = self.attributes;
        deal.renewal_date = self.renewal_date;
        deal.contact_id = self.contact_id;
        Ok(deal)
    }
}

/// Direct field edit. The stage is deliberately absent: only the board's
/// stage transition moves a deal between columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealUpdate {
    pub title: Option<String>,
    pub value: FieldUpdate<Decimal>,
    pub category: Option<DealCategory>,
    pub renewal_date: FieldUpdate<NaiveDate>,
    pub status: Option<DealStatus>,
    /// Merged into the existing attributes, key by key.
    pub attributes: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_deal_validation() {
        assert!(NewDeal::new("   ", "NOVO").into_deal().is_err());

        let mut negative = NewDeal::new("Seguro auto", "NOVO");
        negative.value = Some(Decimal::new(-100, 0));
        assert!(matches!(
            negative.into_deal(),
            Err(CrmError::Validation(_))
        ));

        let mut ok = NewDeal::new("  Seguro auto  ", "NOVO");
        ok.value = Some(Decimal::new(150_000, 2));
        ok.category = DealCategory::Auto;
        let deal = ok.into_deal().unwrap();
        assert_eq!(deal.title, "Seguro auto");
        assert_eq!(deal.value, Some(Decimal::new(1500, 0)));
        assert_eq!(deal.category, DealCategory::Auto);
        assert_eq!(deal.status, DealStatus::Active);
    }

    #[test]
    fn test_move_to_stage_logs_transition() {
        let mut deal = Deal::new("Plano saúde", "NOVO");
        deal.move_to_stage("COTACAO");
        deal.move_to_stage("COTACAO");

        assert_eq!(deal.stage, "COTACAO");
        assert_eq!(deal.get_logs().len(), 1);
        assert_eq!(deal.get_logs()[0].message, "Stage changed from NOVO to COTACAO");
    }

    #[test]
    fn test_apply_update() {
        let mut deal = Deal::new("Consórcio imóvel", "NOVO");
        deal.value = Some(Decimal::new(10, 0));
        deal.renewal_date = NaiveDate::from_ymd_opt(2025, 1, 31);
        deal.attributes.insert("lives".into(), json!(3));

        let mut attributes = Map::new();
        attributes.insert("administradora".into(), json!("Porto"));

        deal.apply(DealUpdate {
            title: Some("Consórcio imóvel 300k".into()),
            value: FieldUpdate::Clear,
            renewal_date: FieldUpdate::NoChange,
            attributes: Some(attributes),
            ..DealUpdate::default()
        })
        .unwrap();

        assert_eq!(deal.title, "Consórcio imóvel 300k");
        assert_eq!(deal.value, None);
        assert_eq!(deal.renewal_date, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert_eq!(deal.attributes["lives"], json!(3));
        assert_eq!(deal.attributes["administradora"], json!("Porto"));
        assert_eq!(deal.stage, "NOVO");
    }

    #[test]
    fn test_apply_rejects_negative_value() {
        let mut deal = Deal::new("Vida", "NOVO");
        let result = deal.apply(DealUpdate {
            value: FieldUpdate::Set(Decimal::new(-1, 0)),
            ..DealUpdate::default()
        });
        assert!(result.is_err());
        assert_eq!(deal.value, None);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("saude".parse::<DealCategory>().unwrap(), DealCategory::Saude);
        assert_eq!(
            serde_json::to_string(&DealCategory::Consorcio).unwrap(),
            "\"CONSORCIO\""
        );
        assert!("boat".parse::<DealCategory>().is_err());
    }
}
