use crate::commands::common::{resolve_entry, CliContext};
use crate::error::CliError;

pub async fn run_delete(id: &str, context: &CliContext) -> Result<(), CliError> {
    let repo = context.open_repository()?;
    let entry = resolve_entry(id, &repo).await?;
    repo.delete_entry(&entry.id).await?;

    println!("Deleted {}", entry.id);
    Ok(())
}
