use crate::cli::{LeadAction, LeadIngestArgs};
use crate::context::CliContext;
use crate::output;
use crm_domain::{InboundLead, PipelineStore};
use serde_json::Value;

pub async fn handle(ctx: &CliContext, action: LeadAction) -> anyhow::Result<()> {
    match action {
        LeadAction::Ingest(args) => {
            let ingested = ctx.store.ingest_lead(inbound_lead(args)).await?;
            tracing::info!(
                deal_id = %ingested.deal.id,
                contact_id = %ingested.contact.id,
                "Lead ingested"
            );
            output::output_success(&ingested);
        }
    }
    Ok(())
}

fn inbound_lead(args: LeadIngestArgs) -> InboundLead {
    InboundLead {
        name: args.name,
        phone: args.phone,
        email: args.email,
        category: args.category,
        summary: args.summary,
        value: args.value,
        extra: args
            .extra
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    }
}
