use clap::ArgMatches;

use crate::args::SinkholeArgs;
use crate::error::AppResult;

use super::super::types::ConfigFile;
use super::util::{is_cli, seconds};

pub(super) fn apply_output_config(
    args: &mut SinkholeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose_logging
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_save_metrics")
        && let Some(save) = config.save_metrics
    {
        args.no_save_metrics = !save;
    }

    if !is_cli(matches, "metrics_file")
        && let Some(path) = config.metrics_file.clone()
    {
        args.metrics_file = path;
    }

    if !is_cli(matches, "save_interval")
        && let Some(interval) = config.save_interval.as_ref()
    {
        args.save_interval = seconds(interval)?;
    }

    if !is_cli(matches, "metrics_log")
        && let Some(path) = config.metrics_log.clone()
    {
        args.metrics_log = Some(path);
    }

    if !is_cli(matches, "progress_interval")
        && let Some(interval) = config.progress_interval.as_ref()
    {
        args.progress_interval = seconds(interval)?;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}
