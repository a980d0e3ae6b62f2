use chrono::{DateTime, Utc};
use crm_core::{CrmError, CrmResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub type StageId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageColor {
    Blue,
    Yellow,
    Amber,
    Purple,
    Green,
    Emerald,
    Red,
    Slate,
}

impl StageColor {
    pub const ALL: [StageColor; 8] = [
        StageColor::Blue,
        StageColor::Yellow,
        StageColor::Amber,
        StageColor::Purple,
        StageColor::Green,
        StageColor::Emerald,
        StageColor::Red,
        StageColor::Slate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageColor::Blue => "blue",
            StageColor::Yellow => "yellow",
            StageColor::Amber => "amber",
            StageColor::Purple => "purple",
            StageColor::Green => "green",
            StageColor::Emerald => "emerald",
            StageColor::Red => "red",
            StageColor::Slate => "slate",
        }
    }
}

impl fmt::Display for StageColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageColor {
    type Err = CrmError;

    /// Accepts plain names (`purple`) as well as utility classes
    /// (`bg-purple-500`) stored by older clients.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let name = lowered.strip_prefix("bg-").unwrap_or(&lowered);
        let name = name
            .rsplit_once('-')
            .filter(|(_, shade)| shade.chars().all(|c| c.is_ascii_digit()))
            .map(|(base, _)| base)
            .unwrap_or(name);

        StageColor::ALL
            .into_iter()
            .find(|color| color.as_str() == name)
            .ok_or_else(|| CrmError::Validation(format!("Unknown stage color: '{}'", s)))
    }
}

/// Business meaning of landing in a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageOutcome {
    #[default]
    Open,
    Won,
    Lost,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageOutcome::Open => "OPEN",
            StageOutcome::Won => "WON",
            StageOutcome::Lost => "LOST",
        };
        f.write_str(label)
    }
}

impl FromStr for StageOutcome {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(StageOutcome::Open),
            "WON" => Ok(StageOutcome::Won),
            "LOST" => Ok(StageOutcome::Lost),
            _ => Err(CrmError::Validation(format!("Unknown stage outcome: '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub order: i32,
    pub color: StageColor,
    #[serde(default)]
    pub outcome: StageOutcome,
    /// Part of the seeded pipeline; cannot be deleted.
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stage {
    pub fn new(
        id: impl Into<StageId>,
        name: impl Into<String>,
        order: i32,
        color: StageColor,
        outcome: StageOutcome,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            order,
            color,
            outcome,
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_order(&mut self, order: i32) {
        self.order = order;
        self.updated_at = Utc::now();
    }

    /// Applies a partial update. The ordinal is never touched here.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(outcome) = update.outcome {
            self.outcome = outcome;
        }
        self.updated_at = Utc::now();
    }

    pub fn into_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub name: Option<String>,
    pub color: Option<StageColor>,
    pub outcome: Option<StageOutcome>,
}

impl StageUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.outcome.is_none()
    }
}

/// One entry of a bulk reorder request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOrder {
    pub id: StageId,
    pub order: i32,
}

impl StageOrder {
    pub fn new(id: impl Into<StageId>, order: i32) -> Self {
        Self {
            id: id.into(),
            order,
        }
    }
}

/// Derives a URL-safe identifier from a display name.
///
/// Diacritics are folded (`ç` → `c`), whitespace runs become a single
/// hyphen and anything outside `[a-z0-9-]` is dropped.
///
/// ```
/// use crm_domain::slugify;
///
/// assert_eq!(slugify("Em Negociação"), "em-negociacao");
/// ```
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Ordinal for a stage appended after every existing one.
pub fn next_ordinal(stages: &[Stage]) -> i32 {
    stages.iter().map(|s| s.order).max().map_or(0, |max| max + 1)
}

pub fn sort_by_ordinal(stages: &mut [Stage]) {
    stages.sort_by_key(|s| s.order);
}

/// The pipeline every new workspace starts with.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("NOVO", "Novos Leads", 0, StageColor::Blue, StageOutcome::Open),
        Stage::new("COTACAO", "Em Cotação", 1, StageColor::Yellow, StageOutcome::Open),
        Stage::new("FECHAMENTO", "Fechamento", 2, StageColor::Purple, StageOutcome::Open),
        Stage::new("GANHO", "Ganho", 3, StageColor::Green, StageOutcome::Won),
        Stage::new("PERDIDO", "Perdido", 4, StageColor::Red, StageOutcome::Lost),
    ]
    .into_iter()
    .map(Stage::into_default)
    .collect()
}

/// Checks that a bulk reorder leaves every ordinal unique and only permutes
/// the ordinals already in use.
pub fn validate_reorder(stages: &[Stage], orders: &[StageOrder]) -> CrmResult<()> {
    let mut requested: HashMap<&str, i32> = HashMap::with_capacity(orders.len());
    for entry in orders {
        if requested.insert(entry.id.as_str(), entry.order).is_some() {
            return Err(CrmError::Validation(format!(
                "Stage '{}' appears more than once in the reorder request",
                entry.id
            )));
        }
        if !stages.iter().any(|s| s.id == entry.id) {
            return Err(CrmError::StageNotFound(entry.id.clone()));
        }
    }

    let mut before: Vec<i32> = stages.iter().map(|s| s.order).collect();
    let mut after: Vec<i32> = stages
        .iter()
        .map(|s| requested.get(s.id.as_str()).copied().unwrap_or(s.order))
        .collect();

    let unique: HashSet<i32> = after.iter().copied().collect();
    if unique.len() != after.len() {
        return Err(CrmError::Validation(
            "Reorder would give two stages the same position".into(),
        ));
    }

    before.sort_unstable();
    after.sort_unstable();
    if before != after {
        return Err(CrmError::Validation(
            "Reorder must permute the existing positions".into(),
        ));
    }
    Ok(())
}

/// Applies an already validated reorder and restores ordinal order.
pub fn apply_reorder(stages: &mut [Stage], orders: &[StageOrder]) {
    for entry in orders {
        if let Some(stage) = stages.iter_mut().find(|s| s.id == entry.id) {
            if stage.order != entry.order {
                stage.update_order(entry.order);
            }
        }
    }
    sort_by_ordinal(stages);
}
