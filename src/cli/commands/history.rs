//! History command implementation.

use crate::chat::view_history;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::history;
use crate::identity::{user_name_from_env, ConfigRoleResolver};
use crate::render;
use anyhow::Result;

/// Print the history visible to the current user. Needs no model access.
pub async fn run_history(settings: &Settings) -> Result<()> {
    preflight::check(Operation::History, settings)?;

    let store = history::open(settings).await?;
    let resolver = ConfigRoleResolver::from_settings(&settings.identity);
    let user_name = user_name_from_env(&settings.identity);

    let view = view_history(store.as_ref(), &resolver, &user_name).await?;

    Output::header(&format!(
        "Chat History ({}, {})",
        view.identity.user_name, view.identity.role
    ));
    println!();
    println!("{}", render::history_table(&view));
    Ok(())
}
