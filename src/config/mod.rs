//! Configuration file loading, CLI merging, and saving.
pub(crate) mod apply;
mod loader;
mod parse;
mod save;
pub mod types;

#[cfg(test)]
mod tests;

pub use apply::apply_config;
pub use loader::load_config;
pub use save::save_config;

#[cfg(any(test, feature = "fuzzing"))]
pub(crate) use loader::load_config_file;
#[cfg(any(test, feature = "fuzzing"))]
pub(crate) use parse::parse_duration_value;
