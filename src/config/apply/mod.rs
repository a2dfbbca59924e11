mod section_fetch;
mod section_output;
mod util;

use clap::ArgMatches;

use crate::args::SinkholeArgs;
use crate::error::AppResult;

use super::types::ConfigFile;

/// Applies configuration values to CLI arguments. Options given on the
/// command line are left untouched.
///
/// # Errors
///
/// Returns an error when a config value is out of range or malformed.
pub fn apply_config(
    args: &mut SinkholeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    section_fetch::apply_fetch_config(args, matches, config)?;
    section_output::apply_output_config(args, matches, config)?;
    Ok(())
}
