//! `esolar watch`: background polling, one snapshot per new reading.

use std::time::Duration;

use esolar_core::ReadingSource;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (portal, profile) = super::build_portal(global, args.fields)?;
    let interval = match args.interval {
        Some(interval) => interval,
        None => Duration::from_secs(super::load_config(global)?.defaults.poll_interval),
    };
    if interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }

    tracing::info!(interval = %humantime::format_duration(interval), "watching");
    let color = output::should_color(global.color);
    let mut readings = portal.readings();
    let mut poller = portal.spawn_polling(interval);
    let mut finished = None;
    let mut printed = 0usize;

    loop {
        tokio::select! {
            changed = readings.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(reading) = readings.borrow_and_update().clone() else {
                    continue;
                };
                let rendered = output::render_reading(
                    global.output,
                    &reading,
                    &ReadingSource::Fresh,
                    portal.schema(),
                    false,
                    color,
                )?;
                output::print_output(&rendered, global.quiet);

                printed += 1;
                if args.count.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            joined = &mut poller => {
                finished = Some(joined);
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
        }
    }

    let joined = match finished {
        Some(joined) => joined,
        None => {
            portal.shutdown();
            poller.await
        }
    };
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(CliError::from_core(e, &profile)),
        Err(e) => {
            tracing::warn!(error = %e, "poll task ended abnormally");
            Err(CliError::PollTask {
                reason: e.to_string(),
            })
        }
    }
}
