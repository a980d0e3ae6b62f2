use crate::cli::ContactAction;
use crate::context::CliContext;
use crate::output;
use crm_domain::{NewContact, PipelineStore};

pub async fn handle(ctx: &CliContext, action: ContactAction) -> anyhow::Result<()> {
    match action {
        ContactAction::List => {
            let contacts = ctx.store.list_contacts().await?;
            output::output_list(contacts);
        }
        ContactAction::Create { name, phone, email } => {
            let contact = ctx
                .store
                .upsert_contact(NewContact { name, phone, email })
                .await?;
            output::output_success(&contact);
        }
    }
    Ok(())
}
