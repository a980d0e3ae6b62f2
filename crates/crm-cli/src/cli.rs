use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use crm_domain::{DealCategory, DealStatus, StageColor, StageOrder, StageOutcome};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "crm")]
#[command(about = "Sales pipeline for an insurance brokerage", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the pipeline data file (or set CRM_FILE env var)
    #[arg(long, short, value_name = "FILE", env = "CRM_FILE", global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Kanban board view
    Board(BoardCommand),
    /// Pipeline stage operations
    Stage(StageCommand),
    /// Deal operations
    Deal(DealCommand),
    /// Contact operations
    Contact(ContactCommand),
    /// Inbound lead intake
    Lead(LeadCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Board commands
#[derive(Args)]
pub struct BoardCommand {
    #[command(subcommand)]
    pub action: BoardAction,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Show every column with its deals, count and estimated total
    Show {
        #[arg(long)]
        category: Option<DealCategory>,
    },
}

// Stage commands
#[derive(Args)]
pub struct StageCommand {
    #[command(subcommand)]
    pub action: StageAction,
}

#[derive(Subcommand)]
pub enum StageAction {
    /// List stages in board order
    List,
    /// Append a new stage after the last one
    Create {
        #[arg(long)]
        name: String,
        /// Defaults to the configured stage color
        #[arg(long)]
        color: Option<StageColor>,
        #[arg(long, default_value = "OPEN")]
        outcome: StageOutcome,
    },
    /// Update a stage's name, color or outcome
    Update(StageUpdateArgs),
    /// Move stages to new positions in one batch
    Reorder {
        /// ID=POSITION, repeatable
        #[arg(long = "order", value_name = "ID=POSITION", required = true, value_parser = parse_stage_order)]
        orders: Vec<StageOrder>,
    },
    /// Delete a stage that holds no deals
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Args)]
pub struct StageUpdateArgs {
    #[arg(long)]
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub color: Option<StageColor>,
    #[arg(long)]
    pub outcome: Option<StageOutcome>,
}

// Deal commands
#[derive(Args)]
pub struct DealCommand {
    #[command(subcommand)]
    pub action: DealAction,
}

#[derive(Subcommand)]
pub enum DealAction {
    /// List deals
    List {
        #[arg(long)]
        category: Option<DealCategory>,
        #[arg(long)]
        stage: Option<String>,
        /// Hide inactive deals
        #[arg(long)]
        active: bool,
    },
    /// Get a specific deal
    Get {
        #[arg(long)]
        id: Uuid,
    },
    /// Create a new deal
    Create(DealCreateArgs),
    /// Update a deal's details
    Update(DealUpdateArgs),
    /// Drag a deal onto another stage
    Move {
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        stage: String,
    },
}

#[derive(Args)]
pub struct DealCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub stage: String,
    #[arg(long)]
    pub value: Option<Decimal>,
    #[arg(long)]
    pub category: Option<DealCategory>,
    /// Policy renewal date (YYYY-MM-DD)
    #[arg(long)]
    pub renewal_date: Option<NaiveDate>,
    #[arg(long)]
    pub contact_id: Option<Uuid>,
    /// Category specific field as KEY=VALUE, repeatable
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,
}

#[derive(Args)]
pub struct DealUpdateArgs {
    #[arg(long)]
    pub id: Uuid,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, conflicts_with = "clear_value")]
    pub value: Option<Decimal>,
    #[arg(long)]
    pub clear_value: bool,
    #[arg(long)]
    pub category: Option<DealCategory>,
    #[arg(long, conflicts_with = "clear_renewal_date")]
    pub renewal_date: Option<NaiveDate>,
    #[arg(long)]
    pub clear_renewal_date: bool,
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
    #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Inactive,
}

impl From<StatusArg> for DealStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Active => DealStatus::Active,
            StatusArg::Inactive => DealStatus::Inactive,
        }
    }
}

// Contact commands
#[derive(Args)]
pub struct ContactCommand {
    #[command(subcommand)]
    pub action: ContactAction,
}

#[derive(Subcommand)]
pub enum ContactAction {
    /// List contacts
    List,
    /// Create a contact, or return the one with the same phone or email
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

// Lead commands
#[derive(Args)]
pub struct LeadCommand {
    #[command(subcommand)]
    pub action: LeadAction,
}

#[derive(Subcommand)]
pub enum LeadAction {
    /// Upsert the contact by phone and open a deal in the first stage
    Ingest(LeadIngestArgs),
}

#[derive(Args)]
pub struct LeadIngestArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    /// Required; the lead is refused without it
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub category: Option<DealCategory>,
    /// Deal title, defaults to "<category> - <name>"
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long)]
    pub value: Option<Decimal>,
    /// Extra field as KEY=VALUE, repeatable (`renovacao=YYYY-MM-DD` sets the renewal date)
    #[arg(long = "extra", value_name = "KEY=VALUE", value_parser = parse_attribute)]
    pub extra: Vec<(String, String)>,
}

fn parse_stage_order(raw: &str) -> Result<StageOrder, String> {
    let (id, position) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=POSITION, got '{}'", raw))?;
    let position = position
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid position in '{}': {}", raw, e))?;
    Ok(StageOrder::new(id.trim(), position))
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
