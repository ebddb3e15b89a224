use crate::domain::ports::{AccountStore, TransferStore};
use crate::domain::schema::Schema;
use crate::error::Result;
use tracing::info;

/// One-time collection setup: drops every account and journal record, installs
/// `schema` and leaves an empty unique index behind.
///
/// Running it again produces the same state, so a failed run can simply be repeated.
pub async fn bootstrap(
    accounts: &dyn AccountStore,
    transfers: &dyn TransferStore,
    schema: &Schema,
) -> Result<()> {
    schema.check()?;
    accounts.clear().await?;
    transfers.clear().await?;
    accounts.install_schema(schema.clone()).await?;
    info!(
        title = schema.title.as_deref().unwrap_or("untitled"),
        required = ?schema.required,
        "bootstrapped accounts collection"
    );
    Ok(())
}
