use crate::cli::{DealAction, DealCreateArgs, DealUpdateArgs};
use crate::context::CliContext;
use crate::output;
use crm_core::CrmError;
use crm_domain::{
    ActiveOnlyFilter, CompositeFilter, Deal, DealFilter, DealId, DealUpdate, DragOutcome,
    DropTarget, FieldUpdate, NewDeal, Notification, NotificationCenter, PipelineStore, Point,
    StageFilter, StageId,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum MoveReport {
    Committed {
        deal: Deal,
    },
    Unchanged {
        deal_id: DealId,
    },
    Cancelled {
        deal_id: DealId,
    },
    RolledBack {
        deal_id: DealId,
        restored_stage: StageId,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification: Option<Notification>,
    },
}

pub async fn handle(ctx: &CliContext, action: DealAction) -> anyhow::Result<()> {
    match action {
        DealAction::List {
            category,
            stage,
            active,
        } => {
            let deals = ctx.store.list_deals(category).await?;
            let mut filter = CompositeFilter::new();
            if let Some(stage) = stage.as_deref() {
                filter = filter.with_filter(Box::new(StageFilter::new(stage)));
            }
            if active {
                filter = filter.with_filter(Box::new(ActiveOnlyFilter));
            }
            let deals: Vec<Deal> = deals.into_iter().filter(|d| filter.matches(d)).collect();
            output::output_list(deals);
        }
        DealAction::Get { id } => match ctx.store.get_deal(id).await? {
            Some(deal) => output::output_success(&deal),
            None => output::output_error(&CrmError::DealNotFound(id).to_string()),
        },
        DealAction::Create(args) => {
            let deal = ctx.store.create_deal(new_deal(args)).await?;
            output::output_success(&deal);
        }
        DealAction::Update(args) => {
            let id = args.id;
            let deal = ctx.store.update_deal(id, deal_update(args)).await?;
            output::output_success(&deal);
        }
        DealAction::Move { id, stage } => handle_move(ctx, id, stage).await?,
    }
    Ok(())
}

fn attributes(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

fn new_deal(args: DealCreateArgs) -> NewDeal {
    let mut deal = NewDeal::new(args.title, args.stage);
    deal.value = args.value;
    deal.category = args.category.unwrap_or_default();
    deal.renewal_date = args.renewal_date;
    deal.contact_id = args.contact_id;
    deal.attributes = attributes(args.attributes);
    deal
}

fn deal_update(args: DealUpdateArgs) -> DealUpdate {
    let value = if args.clear_value {
        FieldUpdate::Clear
    } else {
        args.value.into()
    };
    let renewal_date = if args.clear_renewal_date {
        FieldUpdate::Clear
    } else {
        args.renewal_date.into()
    };
    DealUpdate {
        title: args.title,
        value,
        category: args.category,
        renewal_date,
        status: args.status.map(Into::into),
        attributes: (!args.attributes.is_empty()).then(|| attributes(args.attributes)),
    }
}

/// Replays a full board gesture: pick the card up, drag it past the
/// activation threshold onto the target column and release it there.
async fn handle_move(ctx: &CliContext, id: DealId, stage: StageId) -> anyhow::Result<()> {
    let mut board = ctx.load_board().await?;
    if !board.has_stage(&stage) {
        return Err(CrmError::StageNotFound(stage).into());
    }
    if board.deal(id).is_none() {
        return Err(CrmError::DealNotFound(id).into());
    }

    let mut controller = ctx.drag_controller();
    let mut notifications = NotificationCenter::new();
    let client = ctx.reconciliation_client();
    let target = DropTarget::Column(stage);

    controller.press(id, Point::default())?;
    controller.pointer_move(Point::new(0.0, controller.activation_distance()), &board)?;
    controller.drag_over(&target, &mut board)?;
    let outcome = controller
        .finish(Some(&target), &mut board, &client, &mut notifications)
        .await?;

    match outcome {
        DragOutcome::Committed(deal) => output::output_success(MoveReport::Committed { deal }),
        DragOutcome::Unchanged { deal_id } => {
            output::output_success(MoveReport::Unchanged { deal_id })
        }
        DragOutcome::Cancelled { deal_id } => {
            output::output_success(MoveReport::Cancelled { deal_id })
        }
        DragOutcome::Ignored => output::output_error("Drag gesture did not start"),
        DragOutcome::RolledBack {
            deal_id,
            restored_stage,
            notification,
            error,
        } => {
            let notification = notifications
                .active()
                .iter()
                .find(|n| n.id == notification)
                .cloned();
            let report = MoveReport::RolledBack {
                deal_id,
                restored_stage,
                notification,
            };
            output::output_failure(Some(report), &format!("{:#}", anyhow::Error::from(error)));
        }
    }
    Ok(())
}
