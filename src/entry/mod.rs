use std::ffi::OsString;
use std::path::Path;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::SinkholeArgs;
use crate::error::{AppError, AppResult, ValidationError};

/// Binary entry point: parses arguments, sets up logging and the runtime,
/// and drives a local run.
///
/// # Errors
///
/// Returns an error when arguments or configuration are invalid, or the run
/// cannot start.
pub fn run() -> AppResult<()> {
    let raw_args: Vec<OsString> = std::env::args_os().collect();
    let matches = SinkholeArgs::command().get_matches_from(raw_args);
    let mut args = SinkholeArgs::from_arg_matches(&matches)?;

    apply_config(&mut args, &matches)?;
    crate::system::logger::init_logging(args.verbose, args.no_color);

    if let Some(path) = args.save_config.as_deref() {
        crate::config::save_config(Path::new(path), &args)?;
        println!("Configuration saved to {}", path);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(ValidationError::RuntimeBuildFailed { source: err }))?;

    runtime.block_on(crate::app::run_local(args))
}

fn apply_config(args: &mut SinkholeArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(args, matches, &config)?;
    }
    Ok(())
}
