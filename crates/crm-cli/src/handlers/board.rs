use crate::cli::BoardAction;
use crate::context::CliContext;
use crate::output;
use crm_domain::{BoardStore, Deal, DealCategory, StageColor, StageOutcome};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Serialize)]
struct BoardView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<DealCategory>,
    columns: Vec<ColumnView<'a>>,
}

#[derive(Serialize)]
struct ColumnView<'a> {
    id: &'a str,
    name: &'a str,
    order: i32,
    color: StageColor,
    outcome: StageOutcome,
    deal_count: usize,
    total_value: Decimal,
    deals: Vec<&'a Deal>,
}

pub async fn handle(ctx: &CliContext, action: BoardAction) -> anyhow::Result<()> {
    match action {
        BoardAction::Show { category } => {
            let mut board = ctx.load_board().await?;
            board.set_category_filter(category);
            output::output_success(board_view(&board));
        }
    }
    Ok(())
}

fn board_view(board: &BoardStore) -> BoardView<'_> {
    let columns = board
        .stages()
        .iter()
        .zip(board.column_summaries())
        .map(|(stage, summary)| ColumnView {
            id: &stage.id,
            name: &stage.name,
            order: stage.order,
            color: stage.color,
            outcome: stage.outcome,
            deal_count: summary.deal_count,
            total_value: summary.total_value,
            deals: board.group_by_stage(&stage.id).collect(),
        })
        .collect();

    BoardView {
        category: board.category_filter(),
        columns,
    }
}
