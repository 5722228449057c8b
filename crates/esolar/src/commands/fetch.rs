//! `esolar fetch`: one cycle, one snapshot.

use crate::cli::{FetchArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: FetchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (portal, profile) = super::build_portal(global, args.fields)?;

    let fetched = tokio::select! {
        result = portal.fetch() => result.map_err(|e| CliError::from_core(e, &profile))?,
        _ = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
    };

    let rendered = if args.raw {
        output::render_document(global.output, &fetched.reading.document)?
    } else {
        output::render_reading(
            global.output,
            &fetched.reading,
            &fetched.source,
            portal.schema(),
            args.all,
            output::should_color(global.color),
        )?
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}
