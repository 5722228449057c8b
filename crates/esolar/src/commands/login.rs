//! `esolar login`: submit the login form once.

use owo_colors::OwoColorize;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (portal, profile) = super::build_portal(global, None)?;
    portal
        .verify_login()
        .await
        .map_err(|e| CliError::from_core(e, &profile))?;

    let account = portal.config().account_id();
    let line = if output::should_color(global.color) {
        format!("{} logged in as {account}", "✓".green())
    } else {
        format!("✓ logged in as {account}")
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
