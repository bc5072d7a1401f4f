//! Reset command implementation

use anyhow::{Result, bail};

use super::Engine;

/// Delete a user's progression and routine log
pub async fn reset_command(engine: &Engine, user_id: &str, yes: bool) -> Result<()> {
    if !yes {
        bail!(
            "This deletes all progression for '{}'. Re-run with --yes to confirm.",
            user_id
        );
    }

    let removed = engine.store.reset_user(user_id)?;
    tracing::info!(user_id, removed, "Reset user progression");
    println!("Reset {} ({} category record(s) removed)", user_id, removed);
    Ok(())
}
