use crate::cli::{StageAction, StageUpdateArgs};
use crate::context::CliContext;
use crate::output;
use crm_domain::StageUpdate;

pub async fn handle(ctx: &CliContext, action: StageAction) -> anyhow::Result<()> {
    let manager = ctx.stage_manager();
    match action {
        StageAction::List => {
            let stages = manager.list_stages().await?;
            output::output_list(stages);
        }
        StageAction::Create {
            name,
            color,
            outcome,
        } => {
            let color = color.unwrap_or_else(|| ctx.default_stage_color());
            let stage = manager.create_stage(&name, color, outcome).await?;
            output::output_success(&stage);
        }
        StageAction::Update(args) => {
            let StageUpdateArgs {
                id,
                name,
                color,
                outcome,
            } = args;
            let update = StageUpdate {
                name,
                color,
                outcome,
            };
            if update.is_empty() {
                output::output_error("Nothing to update: pass --name, --color or --outcome");
            }
            let stage = manager.update_stage(&id, update).await?;
            output::output_success(&stage);
        }
        StageAction::Reorder { orders } => {
            let stages = manager.reorder_stages(orders).await?;
            output::output_list(stages);
        }
        StageAction::Delete { id } => {
            manager.delete_stage(&id).await?;
            output::output_success(serde_json::json!({ "deleted": id }));
        }
    }
    Ok(())
}
