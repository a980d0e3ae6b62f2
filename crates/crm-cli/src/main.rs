mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use crm_core::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("CRM_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "crm", &mut std::io::stdout());
        return Ok(());
    }

    let Some(file_path) = cli.file else {
        output::output_error("--file is required (or set CRM_FILE)");
    };
    let ctx = CliContext::new(&file_path, AppConfig::load());

    if let Err(e) = run(&ctx, cli.command).await {
        output::output_error(&format!("{:#}", e));
    }
    Ok(())
}

async fn run(ctx: &CliContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Board(board_cmd) => handlers::board::handle(ctx, board_cmd.action).await,
        Commands::Stage(stage_cmd) => handlers::stage::handle(ctx, stage_cmd.action).await,
        Commands::Deal(deal_cmd) => handlers::deal::handle(ctx, deal_cmd.action).await,
        Commands::Contact(contact_cmd) => {
            handlers::contact::handle(ctx, contact_cmd.action).await
        }
        Commands::Lead(lead_cmd) => handlers::lead::handle(ctx, lead_cmd.action).await,
        Commands::Completions { .. } => Ok(()),
    }
}
